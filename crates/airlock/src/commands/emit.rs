//! Emit commands: render the environment script and write project files.
//!
//! Both commands read the build configuration recorded by a previous fetch.
//! When `--for-output-dir` is not given, paths resolve against the output
//! directory itself, so the script works in place.

use std::path::{Path, PathBuf};

use airlock_core::Error;
use airlock_fetch::{generate_env, inject_files};
use tracing::info;

use crate::cli::CliError;

/// Render the environment script for a previous fetch.
///
/// The script goes to `file` when given, otherwise to stdout.
pub fn execute_generate_env(
    output_dir: &Path,
    for_output_dir: Option<&Path>,
    file: Option<&Path>,
) -> Result<(), CliError> {
    let mount_point = resolve_mount_point(output_dir, for_output_dir)?;
    let script = generate_env(output_dir, &mount_point)?;

    match file {
        Some(path) => {
            std::fs::write(path, &script)
                .map_err(|e| Error::io_with_path(e, path, "writing environment file"))?;
            info!(path = %path.display(), "Wrote environment file");
        }
        None => print!("{script}"),
    }
    Ok(())
}

/// Write the project files recorded by a previous fetch.
pub fn execute_inject_files(
    output_dir: &Path,
    for_output_dir: Option<&Path>,
) -> Result<(), CliError> {
    let mount_point = resolve_mount_point(output_dir, for_output_dir)?;
    let written = inject_files(output_dir, &mount_point)?;
    for path in &written {
        println!("Injected {}", path.display());
    }
    Ok(())
}

fn resolve_mount_point(
    output_dir: &Path,
    for_output_dir: Option<&Path>,
) -> Result<PathBuf, CliError> {
    match for_output_dir {
        Some(path) => Ok(path.to_path_buf()),
        None => {
            let resolved = output_dir
                .canonicalize()
                .map_err(|e| Error::io_with_path(e, output_dir, "canonicalize path"))?;
            Ok(resolved)
        }
    }
}
