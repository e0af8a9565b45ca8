//! Consuming a fetch's outputs: the environment script and injected
//! project files.
//!
//! Both operations read the `.build-config.json` a fetch run wrote and
//! resolve its relative values against `for_output_dir`, the path the
//! output directory will be mounted at inside the build environment.
//! Recorded paths are re-checked against the output directory before
//! use, so a tampered configuration cannot reach outside it.

use std::path::{Path, PathBuf};

use airlock_core::{Error, Result, RootedPath};
use tracing::info;

use crate::output::{BuildConfig, EnvKind};

/// Render a POSIX shell script exporting the build environment.
///
/// Variables are sorted by name so the script is reproducible.
pub fn generate_env(output_dir: &Path, for_output_dir: &Path) -> Result<String> {
    let root = RootedPath::new(output_dir)?;
    let config = BuildConfig::load(output_dir)?;

    let mut variables = config.environment_variables;
    variables.sort_by(|a, b| a.name.cmp(&b.name));

    let mut script = String::new();
    for variable in &variables {
        if variable.kind == EnvKind::Path {
            root.join_within_root(&variable.value)?;
        }
        let value = variable.resolved_value(for_output_dir);
        script.push_str(&format!(
            "export {}='{}'\n",
            variable.name,
            shell_escape(&value)
        ));
    }
    Ok(script)
}

/// Write every project file recorded in the build configuration under
/// the output directory, overwriting existing files. Returns the
/// written paths.
pub fn inject_files(output_dir: &Path, for_output_dir: &Path) -> Result<Vec<PathBuf>> {
    let root = RootedPath::new(output_dir)?;
    let config = BuildConfig::load(output_dir)?;

    let mut written = Vec::with_capacity(config.project_files.len());
    for file in &config.project_files {
        let destination = root.join_within_root(&file.relative_path)?;
        info!(path = %destination, "Writing project file");
        if let Some(parent) = destination.path().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io_with_path(e, parent, "creating project file directory"))?;
        }
        std::fs::write(destination.path(), file.resolve(for_output_dir))
            .map_err(|e| Error::io_with_path(e, destination.path(), "writing project file"))?;
        written.push(destination.path().to_path_buf());
    }
    Ok(written)
}

/// Escape a value for inclusion in single quotes.
fn shell_escape(value: &str) -> String {
    value.replace('\'', "'\\''")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{EnvironmentVariable, ProjectFile};
    use tempfile::TempDir;

    fn write_config(config: &BuildConfig) -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = RootedPath::new(dir.path()).unwrap();
        config.write(&root).unwrap();
        dir
    }

    #[test]
    fn env_script_is_sorted_and_resolves_paths() {
        let dir = write_config(&BuildConfig {
            environment_variables: vec![
                EnvironmentVariable::literal("PIP_NO_INDEX", "true"),
                EnvironmentVariable::path("PIP_FIND_LINKS", "deps/pip"),
            ],
            project_files: Vec::new(),
        });

        let script = generate_env(dir.path(), Path::new("/mnt/output")).unwrap();
        assert_eq!(
            script,
            "export PIP_FIND_LINKS='/mnt/output/deps/pip'\nexport PIP_NO_INDEX='true'\n"
        );
    }

    #[test]
    fn env_values_with_quotes_stay_intact() {
        let dir = write_config(&BuildConfig {
            environment_variables: vec![EnvironmentVariable::literal("WEIRD", "it's quoted")],
            project_files: Vec::new(),
        });

        let script = generate_env(dir.path(), Path::new("/mnt/output")).unwrap();
        assert_eq!(script, "export WEIRD='it'\\''s quoted'\n");
    }

    #[test]
    fn injected_files_land_inside_the_output_dir() {
        let dir = write_config(&BuildConfig {
            environment_variables: Vec::new(),
            project_files: vec![ProjectFile {
                relative_path: PathBuf::from("nested/.npmrc"),
                template: "cache=\"${output_dir}/deps/npm\"\n".to_string(),
            }],
        });

        let written = inject_files(dir.path(), Path::new("/mnt/output")).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("nested/.npmrc"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("nested/.npmrc")).unwrap(),
            "cache=\"/mnt/output/deps/npm\"\n"
        );
    }

    #[test]
    fn escaping_project_files_are_rejected() {
        let dir = write_config(&BuildConfig {
            environment_variables: Vec::new(),
            project_files: vec![ProjectFile {
                relative_path: PathBuf::from("../outside.txt"),
                template: String::new(),
            }],
        });

        let err = inject_files(dir.path(), Path::new("/mnt/output")).unwrap_err();
        assert!(matches!(err, Error::PathOutsideRoot { .. }));
    }

    #[test]
    fn escaping_env_paths_are_rejected() {
        let dir = write_config(&BuildConfig {
            environment_variables: vec![EnvironmentVariable::path("EVIL", "../../etc")],
            project_files: Vec::new(),
        });

        let err = generate_env(dir.path(), Path::new("/mnt/output")).unwrap_err();
        assert!(matches!(err, Error::PathOutsideRoot { .. }));
    }

    #[test]
    fn missing_build_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = generate_env(dir.path(), Path::new("/mnt/output")).unwrap_err();
        assert!(err.to_string().contains(".build-config.json"));
    }
}
