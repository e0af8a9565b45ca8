//! Library surface of the airlock CLI.
//!
//! The binary's logic lives here so integration tests can exercise
//! argument parsing, error mapping, and exit codes directly.

// CLI output goes to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

/// CLI argument parsing, error mapping, and exit codes.
pub mod cli;
/// Command implementations (fetch, generate-env, inject-files).
pub mod commands;
/// Tracing and logging configuration.
pub mod tracing;
