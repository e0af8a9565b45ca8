//! Lockfile parsers.
//!
//! Each supported package manager has a parser that turns its lockfile
//! into [`LockfileEntry`] values. Parsers are strict: an entry a
//! hermetic build could not verify (no resolved URL, no usable checksum)
//! is a parse error, not a silent skip.

use airlock_core::Result;
use std::path::Path;

use crate::types::LockfileEntry;

pub mod npm;
pub mod requirements;
pub mod yarn;

pub use npm::NpmLockfileParser;
pub use requirements::RequirementsParser;
pub use yarn::{YarnClassicLockfileParser, YarnLockfile};

/// Parses a package manager lockfile into its pinned entries.
pub trait LockfileParser {
    /// Parses the lockfile at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`airlock_core::Error::LockfileParseFailed`] when the file
    /// is malformed or pins a dependency in a way airlock cannot verify.
    fn parse(&self, path: &Path) -> Result<Vec<LockfileEntry>>;

    /// The lockfile filename this parser handles.
    fn lockfile_name(&self) -> &'static str;
}
