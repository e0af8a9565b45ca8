//! airlock CLI application.
//!
//! Fetches and verifies build dependencies ahead of a network-isolated
//! build, records them in a CycloneDX SBOM, and emits the environment a
//! build needs to consume them offline.

// CLI output goes to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use airlock::cli::{Cli, CliError, Commands, EXIT_OK, exit_code_for, render_error};
use airlock::commands;
use airlock::tracing::init_tracing;
use clap::Parser;

fn main() {
    // NOTE: Using eprintln! in the panic hook is intentional - tracing
    // infrastructure may be corrupted during a panic.
    #[allow(clippy::print_stderr)]
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panicked: {panic_info}");
        eprintln!("Internal error occurred. Run with --level debug for more information.");
    }));

    let cli = Cli::parse();

    // Ignore error if tracing is already initialized (e.g., in tests)
    let _ = init_tracing(cli.level);

    let exit_code = match dispatch(cli.command) {
        Ok(()) => EXIT_OK,
        Err(err) => {
            let code = exit_code_for(&err);
            render_error(err);
            code
        }
    };
    std::process::exit(exit_code);
}

/// Route a subcommand to its implementation.
///
/// Fetch needs the async runtime for concurrent downloads; the emit
/// commands are synchronous file operations.
fn dispatch(command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Fetch {
            package_manager,
            source,
            output,
            dev_package_managers,
            max_concurrent,
        } => run_with_tokio(commands::fetch::execute(commands::fetch::FetchOptions {
            package_manager,
            source,
            output,
            dev_package_managers,
            max_concurrent,
        })),
        Commands::GenerateEnv {
            output_dir,
            for_output_dir,
            output,
        } => commands::emit::execute_generate_env(
            &output_dir,
            for_output_dir.as_deref(),
            output.as_deref(),
        ),
        Commands::InjectFiles {
            output_dir,
            for_output_dir,
        } => commands::emit::execute_inject_files(&output_dir, for_output_dir.as_deref()),
    }
}

/// Create a tokio runtime and block on the given future.
fn run_with_tokio<F>(future: F) -> Result<(), CliError>
where
    F: std::future::Future<Output = Result<(), CliError>>,
{
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::other(format!("Failed to create tokio runtime: {e}")))?;
    rt.block_on(future)
}
