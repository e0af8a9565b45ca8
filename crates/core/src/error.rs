//! Error types shared across the airlock ecosystem.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for airlock operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while prefetching dependencies.
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// A joined or resolved path escaped the directory it must stay under.
    #[error("Path {} is outside the allowed root {}", path.display(), root.display())]
    #[diagnostic(
        code(airlock::path_outside_root),
        help(
            "The repository may contain malicious symlinks or a workspace glob that points above the project root"
        )
    )]
    PathOutsideRoot {
        /// The offending path.
        path: PathBuf,
        /// The root it was required to stay under.
        root: PathBuf,
    },

    /// A downloaded artifact did not match the checksum pinned in the lockfile.
    #[error("Integrity check failed for \"{package}\": expected {expected}, got {actual}")]
    #[diagnostic(
        code(airlock::integrity),
        help(
            "The artifact served by the registry does not match the lockfile. Refresh the lockfile or investigate the registry"
        )
    )]
    Integrity {
        /// Name of the package whose artifact failed verification.
        package: String,
        /// The checksum recorded in the lockfile.
        expected: String,
        /// The checksum computed from the downloaded artifact.
        actual: String,
    },

    /// Two distinct artifacts would be stored at the same output path.
    #[error("Duplicate tarballs detected: {}", conflicts.join(", "))]
    #[diagnostic(
        code(airlock::duplicate_artifact),
        help("Rename the conflicting dependencies or pin them to distinct versions")
    )]
    DuplicateArtifacts {
        /// The artifact file names that collided.
        conflicts: Vec<String>,
    },

    /// The manifest declares dependencies the lockfile does not pin.
    #[error(
        "Your lockfile needs to be updated, but {manager} was run with `--frozen-lockfile`."
    )]
    #[diagnostic(
        code(airlock::lockfile_consistency),
        help("Run the package manager's install command to bring the lockfile up to date, then retry")
    )]
    LockfileConsistency {
        /// The package manager whose lockfile is stale.
        manager: String,
    },

    /// Unsupported package manager.
    #[error("Unsupported package manager: {manager}")]
    #[diagnostic(
        code(airlock::unsupported_package_manager),
        help("Supported package managers: npm, yarn-classic, pip")
    )]
    UnsupportedPackageManager {
        /// The unsupported package manager name.
        manager: String,
    },

    /// Manifest file not found.
    #[error("Manifest file not found at path: {path}")]
    #[diagnostic(
        code(airlock::manifest_not_found),
        help("Ensure the manifest file exists at the expected location (e.g., 'package.json')")
    )]
    ManifestNotFound {
        /// The path where the manifest was expected.
        path: PathBuf,
    },

    /// Invalid manifest contents.
    #[error("Invalid manifest at {path}: {message}")]
    #[diagnostic(
        code(airlock::invalid_manifest),
        help("Check the manifest file for syntax errors or missing required fields")
    )]
    InvalidManifest {
        /// Path to the invalid manifest.
        path: PathBuf,
        /// Description of what is invalid.
        message: String,
    },

    /// Lockfile not found.
    #[error("Lockfile not found at path: {path}")]
    #[diagnostic(
        code(airlock::lockfile_not_found),
        help("Run your package manager's install command to generate a lockfile")
    )]
    LockfileNotFound {
        /// The path where the lockfile was expected.
        path: PathBuf,
    },

    /// Failed to parse lockfile.
    #[error("Failed to parse lockfile at {path}: {message}")]
    #[diagnostic(
        code(airlock::lockfile_parse_failed),
        help("The lockfile may be corrupted. Try regenerating it with your package manager")
    )]
    LockfileParseFailed {
        /// Path to the lockfile.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// A checksum string could not be parsed.
    #[error("Invalid checksum '{value}': {message}")]
    #[diagnostic(
        code(airlock::invalid_checksum),
        help("Checksums must be Subresource Integrity strings or '<algorithm>:<hex digest>' pairs")
    )]
    InvalidChecksum {
        /// The unparseable checksum string.
        value: String,
        /// Description of the parse failure.
        message: String,
    },

    /// A network download failed.
    #[error("Failed to download {url}: {message}")]
    #[diagnostic(
        code(airlock::network),
        help("Check network connectivity and that the registry is reachable")
    )]
    Network {
        /// The URL being fetched.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// I/O error occurred.
    #[error("I/O error during {operation}{}: {source}", path.as_ref().map(|p| format!(" at {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(airlock::io_error),
        help("Check that the path exists and that you have permission to access it")
    )]
    Io {
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
        /// Optional path where the error occurred.
        path: Option<PathBuf>,
        /// Description of the operation being performed.
        operation: String,
    },

    /// JSON parsing error.
    #[error("JSON parsing error{}: {source}", path.as_ref().map(|p| format!(" in {}", p.display())).unwrap_or_default())]
    #[diagnostic(
        code(airlock::json_error),
        help("Ensure the JSON has valid syntax and matches the expected schema")
    )]
    Json {
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
        /// Optional path to the file being parsed.
        path: Option<PathBuf>,
    },
}

impl Error {
    /// Create a `PathOutsideRoot` error.
    #[must_use]
    pub fn path_outside_root(path: impl Into<PathBuf>, root: impl Into<PathBuf>) -> Self {
        Self::PathOutsideRoot {
            path: path.into(),
            root: root.into(),
        }
    }

    /// Create an `Integrity` error for a named package.
    #[must_use]
    pub fn integrity(
        package: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::Integrity {
            package: package.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an I/O error with path and operation context.
    #[must_use]
    pub fn io_with_path(
        source: std::io::Error,
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.into()),
            operation: operation.into(),
        }
    }

    /// Create an `InvalidManifest` error.
    #[must_use]
    pub fn invalid_manifest(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidManifest {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a `LockfileParseFailed` error.
    #[must_use]
    pub fn lockfile_parse_failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::LockfileParseFailed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a `Network` error.
    #[must_use]
    pub fn network(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: None,
            operation: "file operation".to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source, path: None }
    }
}
