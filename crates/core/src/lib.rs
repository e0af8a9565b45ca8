//! Core types shared by every airlock crate.
//!
//! This crate holds the pieces the rest of the prefetcher is built on:
//!
//! - [`Error`] / [`Result`] - the error taxonomy for the whole workspace,
//!   with miette diagnostics and stable error codes
//! - [`RootedPath`] - absolute paths that provably stay inside a root
//!   directory, the containment primitive for both the source repository
//!   and the output directory
//! - [`Checksum`] / [`Algorithm`] - lockfile digest parsing and streaming
//!   artifact verification
//!
//! # Example
//!
//! ```rust,ignore
//! use airlock_core::{Checksum, RootedPath};
//!
//! let source = RootedPath::new("/work/source")?;
//! let lockfile = source.join_within_root("yarn.lock")?;
//!
//! let checksum = Checksum::parse_sri("sha512-3e49...")?;
//! checksum.verify_file(lockfile.path(), "my-package")?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod checksum;
pub mod error;
pub mod rooted_path;

// Re-export core types
pub use checksum::{Algorithm, Checksum};
pub use error::{Error, Result};
pub use rooted_path::RootedPath;

/// Vendor recorded in generated SBOM tool metadata.
pub const TOOL_VENDOR: &str = "airlock";

/// Tool name recorded in generated SBOM tool metadata and in the
/// provenance property attached to every reported component.
pub const TOOL_NAME: &str = "airlock";
