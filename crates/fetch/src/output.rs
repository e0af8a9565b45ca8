//! Build configuration persisted next to the fetched artifacts.
//!
//! A fetch run records everything the hermetic build step needs in a
//! `.build-config.json` at the output directory root: environment
//! variables to export and project files to rewrite. The values stay
//! relative to the output directory so the artifacts can be mounted at
//! a different path inside the build environment.

use std::path::{Path, PathBuf};

use airlock_core::{Error, Result, RootedPath};
use serde::{Deserialize, Serialize};

/// File name of the persisted build configuration.
pub const BUILD_CONFIG_FILENAME: &str = ".build-config.json";

/// How an environment variable's value is interpreted at build time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvKind {
    /// The value is used verbatim.
    Literal,
    /// The value is a path relative to the mounted output directory.
    Path,
}

/// One environment variable the build must export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    /// Variable name.
    pub name: String,
    /// Raw value, interpreted according to `kind`.
    pub value: String,
    /// How the value is interpreted at build time.
    pub kind: EnvKind,
}

impl EnvironmentVariable {
    /// A variable exported verbatim.
    pub fn literal(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: EnvKind::Literal,
        }
    }

    /// A variable whose value is resolved against the mounted output
    /// directory.
    pub fn path(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind: EnvKind::Path,
        }
    }

    /// The value to export once the output directory is mounted at
    /// `for_output_dir`.
    #[must_use]
    pub fn resolved_value(&self, for_output_dir: &Path) -> String {
        match self.kind {
            EnvKind::Literal => self.value.clone(),
            EnvKind::Path => for_output_dir.join(&self.value).display().to_string(),
        }
    }
}

/// A file to write under the output directory before the build runs.
///
/// The template may reference `${output_dir}`, which is substituted
/// with the mounted location of the output directory. The source tree
/// is never touched; the build step copies the rendered file into
/// place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Destination, relative to the output directory root.
    pub relative_path: PathBuf,
    /// File contents, with `${output_dir}` placeholders.
    pub template: String,
}

impl ProjectFile {
    /// Render the template against the mounted output directory.
    #[must_use]
    pub fn resolve(&self, for_output_dir: &Path) -> String {
        self.template
            .replace("${output_dir}", &for_output_dir.display().to_string())
    }
}

/// Everything a hermetic build needs beyond the artifacts themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Variables to export before the build runs.
    pub environment_variables: Vec<EnvironmentVariable>,
    /// Files to write into the project before the build runs.
    pub project_files: Vec<ProjectFile>,
}

impl BuildConfig {
    /// Persist the configuration at the output directory root.
    pub fn write(&self, output_dir: &RootedPath) -> Result<PathBuf> {
        let path = output_dir.join_within_root(BUILD_CONFIG_FILENAME)?;
        let contents = serde_json::to_string_pretty(self).map_err(|source| Error::Json {
            source,
            path: Some(path.path().to_path_buf()),
        })?;
        std::fs::write(path.path(), contents)
            .map_err(|e| Error::io_with_path(e, path.path(), "writing build configuration"))?;
        Ok(path.path().to_path_buf())
    }

    /// Load a configuration written by a previous fetch run.
    pub fn load(output_dir: &Path) -> Result<Self> {
        let path = output_dir.join(BUILD_CONFIG_FILENAME);
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| Error::io_with_path(e, &path, "reading build configuration"))?;
        serde_json::from_str(&contents).map_err(|source| Error::Json {
            source,
            path: Some(path),
        })
    }
}
