//! `package.json` model.
//!
//! Only the fields airlock needs are deserialized: the package identity,
//! the dependency maps used for lockfile consistency checks, and the
//! `workspaces` declaration. Everything else is ignored.

use airlock_core::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// A parsed `package.json`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PackageJson {
    /// Declared package name.
    #[serde(default)]
    pub name: Option<String>,
    /// Declared package version.
    #[serde(default)]
    pub version: Option<String>,
    /// Workspace declaration in any of the shapes npm and Yarn accept.
    #[serde(default)]
    pub workspaces: Option<WorkspacesDeclaration>,
    /// Runtime dependencies.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// Development-time dependencies.
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
    /// Optional dependencies.
    #[serde(default, rename = "optionalDependencies")]
    pub optional_dependencies: BTreeMap<String, String>,
    /// Pinned package manager, e.g. `yarn@3.6.1`.
    #[serde(default, rename = "packageManager")]
    pub package_manager: Option<String>,
}

impl PackageJson {
    /// Reads and parses a `package.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ManifestNotFound`] when the file does not exist and
    /// [`Error::InvalidManifest`] when it is not valid JSON.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|source| Error::io_with_path(source, path, "reading package.json"))?;
        serde_json::from_str(&contents)
            .map_err(|source| Error::invalid_manifest(path, source.to_string()))
    }

    /// Every dependency the manifest declares, across the runtime, dev,
    /// and optional maps.
    pub fn declared_dependencies(&self) -> impl Iterator<Item = (&String, &String)> {
        self.dependencies
            .iter()
            .chain(self.dev_dependencies.iter())
            .chain(self.optional_dependencies.iter())
    }
}

/// The `workspaces` field of a `package.json`.
///
/// npm and Yarn accept either a plain list of glob patterns or an object
/// whose `packages` key holds the list (Yarn additionally tolerates keys
/// like `nohoist` in the object form). Any other shape is preserved as
/// [`WorkspacesDeclaration::Unsupported`] so callers can warn about it
/// without failing the whole request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum WorkspacesDeclaration {
    /// `"workspaces": ["packages/*"]`
    Globs(Vec<String>),
    /// `"workspaces": {"packages": ["packages/*"], ...}`
    Detailed {
        /// The glob patterns under the `packages` key.
        #[serde(default)]
        packages: Vec<String>,
    },
    /// Any shape airlock does not understand.
    Unsupported(serde_json::Value),
}

impl WorkspacesDeclaration {
    /// The declared glob patterns, or `None` for unsupported shapes.
    ///
    /// An object without a `packages` key normalizes to an empty list,
    /// matching how npm and Yarn treat it.
    #[must_use]
    pub fn normalize(&self) -> Option<&[String]> {
        match self {
            Self::Globs(patterns) => Some(patterns),
            Self::Detailed { packages } => Some(packages),
            Self::Unsupported(_) => None,
        }
    }
}

/// Reads a JSON file into any deserializable type.
pub(crate) fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .map_err(|source| Error::io_with_path(source, path, "reading json file"))?;
    serde_json::from_str(&contents).map_err(|source| Error::Json {
        source,
        path: Some(path.to_path_buf()),
    })
}
