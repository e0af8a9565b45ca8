//! CLI argument parsing, error mapping, and exit codes.

use std::io::{self, Write as _};
use std::path::PathBuf;

use airlock_fetch::DEFAULT_MAX_CONCURRENT;
use airlock_workspaces::PackageManager;
use clap::{Parser, Subcommand};
use miette::{Diagnostic, Report};
use thiserror::Error;

use crate::tracing::LogLevel;

/// Exit code for a successful run.
pub const EXIT_OK: i32 = 0;
/// Exit code for invalid command-line usage.
pub const EXIT_CLI: i32 = 2;
/// Exit code for a failed fetch or emit operation.
pub const EXIT_FETCH: i32 = 3;

/// Errors surfaced to the user by the CLI.
///
/// Operation failures wrap [`airlock_core::Error`] transparently so the
/// diagnostic codes and help text defined there reach the terminal unchanged.
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// Invalid command-line usage or configuration.
    #[error("CLI error: {message}")]
    #[diagnostic(code(airlock::cli))]
    Config {
        /// What was wrong with the invocation.
        message: String,
        /// Optional hint shown below the error.
        #[help]
        help: Option<String>,
    },

    /// A fetch or emit operation failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Core(#[from] airlock_core::Error),

    /// Unexpected internal failure.
    #[error("Unexpected error: {message}")]
    #[diagnostic(code(airlock::cli::internal))]
    Other {
        /// Description of the failure.
        message: String,
        /// Optional hint shown below the error.
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a usage error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a usage error with a hint.
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an internal error.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }
}

/// Map an error to the process exit code.
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Core(_) | CliError::Other { .. } => EXIT_FETCH,
    }
}

/// Render an error to stderr through miette's report formatter.
pub fn render_error(err: CliError) {
    let report = Report::new(err);
    eprintln!("{report:?}");
    let _ = io::stderr().flush();
}

/// Fetch dependencies ahead of a network-isolated build.
#[derive(Parser, Debug)]
#[command(
    name = "airlock",
    version,
    about = "Fetch and verify build dependencies for hermetic builds"
)]
pub struct Cli {
    /// Log verbosity for diagnostic output on stderr.
    #[arg(
        short = 'L',
        long = "level",
        value_enum,
        default_value = "warn",
        global = true
    )]
    pub level: LogLevel,

    /// The operation to run.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch and verify dependencies into an output directory.
    Fetch {
        /// Package manager to fetch for.
        #[arg(value_name = "PACKAGE_MANAGER", value_parser = parse_package_manager)]
        package_manager: PackageManager,

        /// Project directory containing the manifest and lockfile.
        #[arg(long, short = 's', default_value = ".")]
        source: PathBuf,

        /// Directory artifacts, the SBOM, and the build config are written into.
        #[arg(long, short = 'o', default_value = "airlock-output")]
        output: PathBuf,

        /// Allow package managers that are still in development.
        #[arg(long)]
        dev_package_managers: bool,

        /// Maximum number of concurrent downloads.
        #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT)]
        max_concurrent: usize,
    },

    /// Print the environment a build needs to consume fetched dependencies.
    GenerateEnv {
        /// Output directory of a previous fetch.
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Path the output directory will be mounted at during the build.
        #[arg(long)]
        for_output_dir: Option<PathBuf>,

        /// Write the script to this file instead of stdout.
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Write the configuration files a build expects into the project.
    InjectFiles {
        /// Output directory of a previous fetch.
        #[arg(value_name = "OUTPUT_DIR")]
        output_dir: PathBuf,

        /// Path the output directory will be mounted at during the build.
        #[arg(long)]
        for_output_dir: Option<PathBuf>,
    },
}

fn parse_package_manager(value: &str) -> Result<PackageManager, String> {
    value
        .parse()
        .map_err(|err: airlock_core::Error| err.to_string())
}
