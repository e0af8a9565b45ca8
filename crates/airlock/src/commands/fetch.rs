//! Fetch command: resolve, download, verify, and record dependencies.

use std::path::PathBuf;

use airlock_fetch::{FetchReport, FetchRequest, run_fetch};
use airlock_workspaces::PackageManager;

use crate::cli::CliError;

/// Arguments collected from the command line for a fetch run.
#[derive(Debug)]
pub struct FetchOptions {
    /// Ecosystem to process.
    pub package_manager: PackageManager,
    /// Directory containing the project to fetch dependencies for.
    pub source: PathBuf,
    /// Directory to place fetched artifacts and metadata in.
    pub output: PathBuf,
    /// Allow package managers that cannot guarantee reproducible output.
    pub dev_package_managers: bool,
    /// Maximum number of concurrent downloads.
    pub max_concurrent: usize,
}

/// Run a fetch and print a short summary to stdout.
pub async fn execute(options: FetchOptions) -> Result<(), CliError> {
    let report = run_fetch(FetchRequest {
        package_manager: options.package_manager,
        source_dir: options.source,
        output_dir: options.output,
        dev_package_managers: options.dev_package_managers,
        max_concurrent: options.max_concurrent,
    })
    .await?;

    print_summary(&report);
    Ok(())
}

fn print_summary(report: &FetchReport) {
    let noun = if report.artifact_count == 1 {
        "artifact"
    } else {
        "artifacts"
    };
    println!("Fetched {} {noun}", report.artifact_count);
    println!("SBOM: {}", report.sbom_path.display());
    println!("Build config: {}", report.build_config_path.display());
}
