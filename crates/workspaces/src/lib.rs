//! Project manifests, workspace discovery, and lockfile parsing.
//!
//! This crate reads the files that describe a project's dependency
//! closure and turns them into typed data the fetch pipeline consumes:
//!
//! - [`manifest::PackageJson`] models the project manifest, including
//!   the polymorphic `workspaces` declaration npm and Yarn accept.
//! - [`discovery::extract_workspace_metadata`] expands workspace globs
//!   into member directories, constrained to the project root.
//! - [`parsers`] holds one strict [`LockfileParser`] per supported
//!   package manager.
//!
//! # Strictness
//!
//! Parsers reject anything a hermetic build could not verify: registry
//! entries without a resolved URL or without a usable checksum fail the
//! parse instead of being skipped. Workspace declarations are the one
//! lenient spot: a declaration shape airlock does not understand logs a
//! warning and resolves to no workspaces.

pub mod discovery;
pub mod manifest;
pub mod parsers;
pub mod types;

pub use discovery::{extract_workspace_metadata, resolve_glob_patterns};
pub use manifest::{PackageJson, WorkspacesDeclaration};
pub use parsers::{
    LockfileParser, NpmLockfileParser, RequirementsParser, YarnClassicLockfileParser, YarnLockfile,
};
pub use types::{DependencySource, LockfileEntry, PackageManager, Workspace};
