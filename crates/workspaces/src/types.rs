//! Shared types describing package managers, lockfile entries, and
//! resolved workspace members.

use airlock_core::{Checksum, Error, RootedPath};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::manifest::PackageJson;

/// Package managers airlock can prefetch dependencies for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    /// npm with a `package-lock.json` (lockfileVersion 2 or 3).
    Npm,
    /// Yarn 1.x with a `yarn.lock`.
    YarnClassic,
    /// pip with a fully pinned `requirements.txt`.
    Pip,
}

impl PackageManager {
    /// The canonical name used on the command line and in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::YarnClassic => "yarn-classic",
            Self::Pip => "pip",
        }
    }

    /// The lockfile this package manager resolves dependencies from.
    #[must_use]
    pub const fn lockfile_name(self) -> &'static str {
        match self {
            Self::Npm => "package-lock.json",
            Self::YarnClassic => "yarn.lock",
            Self::Pip => "requirements.txt",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageManager {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "npm" => Ok(Self::Npm),
            "yarn-classic" | "yarn" => Ok(Self::YarnClassic),
            "pip" => Ok(Self::Pip),
            other => Err(Error::UnsupportedPackageManager {
                manager: other.to_string(),
            }),
        }
    }
}

/// Where a locked dependency comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencySource {
    /// Downloaded from a registry or an arbitrary URL.
    Registry {
        /// The resolved download URL.
        url: String,
    },
    /// A file or directory inside the repository.
    File {
        /// Path as written in the lockfile, relative to the project root.
        path: PathBuf,
    },
    /// A workspace member of the same project.
    Workspace,
    /// Shipped inside another dependency's tarball; nothing to download.
    Bundled,
}

/// One dependency pinned by a lockfile.
///
/// `version` is present for every registry dependency; direct-URL pip
/// requirements and workspace roots may omit it. `checksums` holds every
/// pin declared for the artifact, and verification passes when any one
/// of them matches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockfileEntry {
    /// Package name as the ecosystem spells it (scoped npm names keep
    /// their `@scope/` prefix, pip names are canonicalized).
    pub name: String,
    /// Pinned version, when the lockfile records one.
    pub version: Option<String>,
    /// Where the dependency comes from.
    pub source: DependencySource,
    /// Checksums pinned for the artifact. Empty for sources that have
    /// nothing to download.
    pub checksums: Vec<Checksum>,
    /// Whether the dependency is only needed at development time.
    pub dev: bool,
}

impl LockfileEntry {
    /// Human-readable `name@version` label used in logs and errors.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.version {
            Some(version) => format!("{}@{}", self.name, version),
            None => self.name.clone(),
        }
    }
}

/// A workspace member resolved from the project manifest.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Directory of the member, contained in the project root.
    pub path: RootedPath,
    /// The member's parsed `package.json`.
    pub manifest: PackageJson,
}

impl Workspace {
    /// The member's declared package name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.manifest.name.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_manager_round_trips_through_str() {
        for manager in [
            PackageManager::Npm,
            PackageManager::YarnClassic,
            PackageManager::Pip,
        ] {
            let parsed: PackageManager = manager.as_str().parse().unwrap();
            assert_eq!(parsed, manager);
        }
    }

    #[test]
    fn yarn_alias_is_accepted() {
        let parsed: PackageManager = "yarn".parse().unwrap();
        assert_eq!(parsed, PackageManager::YarnClassic);
    }

    #[test]
    fn unknown_package_manager_is_rejected() {
        let err = "cargo".parse::<PackageManager>().unwrap_err();
        assert!(err.to_string().contains("cargo"));
    }

    #[test]
    fn lockfile_names_match_package_managers() {
        assert_eq!(PackageManager::Npm.lockfile_name(), "package-lock.json");
        assert_eq!(PackageManager::YarnClassic.lockfile_name(), "yarn.lock");
        assert_eq!(PackageManager::Pip.lockfile_name(), "requirements.txt");
    }

    #[test]
    fn label_includes_version_when_present() {
        let entry = LockfileEntry {
            name: "left-pad".to_string(),
            version: Some("1.3.0".to_string()),
            source: DependencySource::Registry {
                url: "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz".to_string(),
            },
            checksums: Vec::new(),
            dev: false,
        };
        assert_eq!(entry.label(), "left-pad@1.3.0");

        let unversioned = LockfileEntry {
            version: None,
            ..entry
        };
        assert_eq!(unversioned.label(), "left-pad");
    }
}
