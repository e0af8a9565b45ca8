//! Yarn classic backend.
//!
//! Yarn 1.x lockfiles pin external packages only; workspace members
//! live as symlinks and never appear in `yarn.lock`. The SBOM therefore
//! merges the discovered workspace tree with the lockfile entries, and
//! the consistency check exempts dependencies that resolve to a
//! workspace member.

use airlock_core::{Error, Result};
use airlock_sbom::{Component, purl};
use airlock_workspaces::{
    DependencySource, PackageJson, PackageManager, Workspace, YarnClassicLockfileParser,
    YarnLockfile, extract_workspace_metadata,
};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::backend::{PackageManagerBackend, PlannedArtifact, ProjectContext, ResolvedLockfile};
use crate::downloader::Downloader;
use crate::output::{BuildConfig, EnvironmentVariable};
use crate::store::{ArtifactStore, dedup_artifacts, tarball_filename};

/// Backend for projects managed with Yarn 1.x.
pub struct YarnClassicBackend {
    downloader: Downloader,
}

impl YarnClassicBackend {
    /// Create the backend around a shared download client.
    #[must_use]
    pub fn new(downloader: Downloader) -> Self {
        Self { downloader }
    }
}

#[async_trait]
impl PackageManagerBackend for YarnClassicBackend {
    fn kind(&self) -> PackageManager {
        PackageManager::YarnClassic
    }

    fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    fn resolve_lockfile(&self, project: &ProjectContext) -> Result<ResolvedLockfile> {
        info!("Processing the request using yarn@1.22.");

        let parser = YarnClassicLockfileParser;
        let lockfile = project.source_dir.join_within_root("yarn.lock")?;
        if !lockfile.path().is_file() {
            return Err(Error::LockfileNotFound {
                path: lockfile.path().to_path_buf(),
            });
        }

        let manifest_path = project.source_dir.join_within_root("package.json")?;
        let root_manifest = PackageJson::load(manifest_path.path())?;
        warn_on_ignored_pin(&root_manifest);

        let parsed = parser.parse_lockfile(lockfile.path())?;
        check_lockfile_satisfies_manifests(project, &root_manifest, &parsed)?;
        debug!(entries = parsed.entries.len(), "Resolved yarn.lock");

        Ok(ResolvedLockfile {
            path: lockfile.path().to_path_buf(),
            entries: parsed.entries,
        })
    }

    fn list_artifacts(
        &self,
        project: &ProjectContext,
        lockfile: &ResolvedLockfile,
    ) -> Result<Vec<PlannedArtifact>> {
        let store = ArtifactStore::new(&project.output_dir, self.kind())?;
        let mut planned = Vec::new();
        for entry in &lockfile.entries {
            let DependencySource::Registry { url } = &entry.source else {
                continue;
            };
            let version = entry.version.as_deref().unwrap_or_default();
            let filename = tarball_filename(&entry.name, version);
            planned.push(store.plan(entry, url, &filename)?);
        }
        dedup_artifacts(planned)
    }

    fn components(
        &self,
        project: &ProjectContext,
        lockfile: &ResolvedLockfile,
    ) -> Result<Vec<Component>> {
        let manifest_path = project.source_dir.join_within_root("package.json")?;
        let root_manifest = PackageJson::load(manifest_path.path())?;

        let mut components = vec![manifest_component(&root_manifest)];
        for workspace in extract_workspace_metadata(&project.source_dir)? {
            components.push(manifest_component(&workspace.manifest));
        }
        for entry in &lockfile.entries {
            components.push(Component::library(
                entry.name.as_str(),
                entry.version.clone(),
                Some(purl::npm(&entry.name, entry.version.as_deref())),
            ));
        }
        Ok(components)
    }

    fn build_config(&self, _project: &ProjectContext) -> BuildConfig {
        BuildConfig {
            environment_variables: vec![
                EnvironmentVariable::path("YARN_YARN_OFFLINE_MIRROR", "deps/yarn-classic"),
                EnvironmentVariable::literal("YARN_YARN_OFFLINE_MIRROR_PRUNING", "false"),
            ],
            project_files: Vec::new(),
        }
    }
}

fn manifest_component(manifest: &PackageJson) -> Component {
    let name = manifest.name.as_deref().unwrap_or("project");
    Component::library(
        name,
        manifest.version.clone(),
        Some(purl::npm(name, manifest.version.as_deref())),
    )
}

/// Yarn 1.x ignores `packageManager` pins for other major versions.
/// Surfacing the mismatch is a warning, never a failure.
fn warn_on_ignored_pin(manifest: &PackageJson) {
    if let Some(pin) = manifest.package_manager.as_deref() {
        if !pin.starts_with("yarn@1.") {
            warn!(pin = %pin, "Ignoring packageManager pin; processing uses yarn@1.22");
        }
    }
}

/// Every `(name, range)` pair declared in the manifests must be present
/// in the lockfile, except pairs that resolve to a workspace member or
/// an explicit symlink.
fn check_lockfile_satisfies_manifests(
    project: &ProjectContext,
    root_manifest: &PackageJson,
    lockfile: &YarnLockfile,
) -> Result<()> {
    let mut manifests = vec![root_manifest.clone()];
    let workspaces = extract_workspace_metadata(&project.source_dir)?;
    for workspace in &workspaces {
        manifests.push(workspace.manifest.clone());
    }
    let member_names: Vec<&str> = workspaces.iter().filter_map(Workspace::name).collect();

    for manifest in &manifests {
        for (name, range) in manifest.declared_dependencies() {
            if range.starts_with("link:") || member_names.contains(&name.as_str()) {
                continue;
            }
            if !lockfile.satisfies(name, range) {
                warn!(
                    package = %name,
                    range = %range,
                    "Dependency declared in package.json but not satisfied by yarn.lock"
                );
                return Err(Error::LockfileConsistency {
                    manager: "yarn".to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use airlock_core::RootedPath;
    use tempfile::TempDir;

    fn sha512_integrity() -> String {
        format!("sha512-{}==", "A".repeat(86))
    }

    fn lockfile_with_left_pad() -> String {
        format!(
            r#"# THIS IS AN AUTOGENERATED FILE. DO NOT EDIT THIS FILE DIRECTLY.
# yarn lockfile v1

"left-pad@^1.3.0":
  version "1.3.0"
  resolved "https://registry.yarnpkg.com/left-pad/-/left-pad-1.3.0.tgz#5b8a3a7765dfe001261dde915589e782f8c94d1e"
  integrity {}
"#,
            sha512_integrity()
        )
    }

    fn project_with(manifest: &str, lockfile: &str) -> (TempDir, ProjectContext) {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        let output = dir.path().join("output");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(source.join("package.json"), manifest).unwrap();
        std::fs::write(source.join("yarn.lock"), lockfile).unwrap();

        let context = ProjectContext {
            source_dir: RootedPath::new(&source).unwrap(),
            output_dir: RootedPath::new(&output).unwrap(),
        };
        (dir, context)
    }

    #[test]
    fn satisfied_manifests_resolve() {
        let manifest = r#"{"name": "app", "dependencies": {"left-pad": "^1.3.0"}}"#;
        let (_dir, context) = project_with(manifest, &lockfile_with_left_pad());

        let resolved = YarnClassicBackend::new(Downloader::new())
            .resolve_lockfile(&context)
            .unwrap();
        assert_eq!(resolved.entries.len(), 1);
        assert_eq!(resolved.entries[0].name, "left-pad");
    }

    #[test]
    fn mismatched_package_manager_pins_do_not_fail_the_run() {
        let manifest =
            r#"{"name": "app", "packageManager": "yarn@3.6.1", "dependencies": {"left-pad": "^1.3.0"}}"#;
        let (_dir, context) = project_with(manifest, &lockfile_with_left_pad());

        let resolved = YarnClassicBackend::new(Downloader::new())
            .resolve_lockfile(&context)
            .unwrap();
        assert_eq!(resolved.entries.len(), 1);
    }

    #[test]
    fn stale_lockfiles_fail_with_the_frozen_lockfile_error() {
        let manifest = r#"{"name": "app", "dependencies": {"left-pad": "^1.4.0"}}"#;
        let (_dir, context) = project_with(manifest, &lockfile_with_left_pad());

        let err = YarnClassicBackend::new(Downloader::new())
            .resolve_lockfile(&context)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Your lockfile needs to be updated, but yarn was run with `--frozen-lockfile`."
        );
    }

    #[test]
    fn workspace_member_references_are_exempt() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        let output = dir.path().join("output");
        std::fs::create_dir_all(source.join("packages/lib")).unwrap();
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(
            source.join("package.json"),
            r#"{"name": "monorepo", "workspaces": ["packages/*"], "dependencies": {"lib": "1.0.0"}}"#,
        )
        .unwrap();
        std::fs::write(
            source.join("packages/lib/package.json"),
            r#"{"name": "lib", "version": "1.0.0"}"#,
        )
        .unwrap();
        std::fs::write(source.join("yarn.lock"), lockfile_with_left_pad()).unwrap();

        let context = ProjectContext {
            source_dir: RootedPath::new(&source).unwrap(),
            output_dir: RootedPath::new(&output).unwrap(),
        };

        let resolved = YarnClassicBackend::new(Downloader::new())
            .resolve_lockfile(&context)
            .unwrap();
        assert_eq!(resolved.entries.len(), 1);
    }

    #[test]
    fn components_merge_workspaces_and_lockfile_entries() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source");
        let output = dir.path().join("output");
        std::fs::create_dir_all(source.join("packages/lib")).unwrap();
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(
            source.join("package.json"),
            r#"{"name": "monorepo", "version": "1.0.0", "workspaces": ["packages/*"]}"#,
        )
        .unwrap();
        std::fs::write(
            source.join("packages/lib/package.json"),
            r#"{"name": "lib", "version": "1.0.0"}"#,
        )
        .unwrap();
        std::fs::write(source.join("yarn.lock"), lockfile_with_left_pad()).unwrap();

        let context = ProjectContext {
            source_dir: RootedPath::new(&source).unwrap(),
            output_dir: RootedPath::new(&output).unwrap(),
        };

        let backend = YarnClassicBackend::new(Downloader::new());
        let resolved = backend.resolve_lockfile(&context).unwrap();
        let components = backend.components(&context, &resolved).unwrap();

        let purls: Vec<Option<&str>> = components.iter().map(|c| c.purl.as_deref()).collect();
        assert!(purls.contains(&Some("pkg:npm/monorepo@1.0.0")));
        assert!(purls.contains(&Some("pkg:npm/lib@1.0.0")));
        assert!(purls.contains(&Some("pkg:npm/left-pad@1.3.0")));
    }

    #[test]
    fn build_config_points_yarn_at_the_offline_mirror() {
        let (_dir, context) = project_with(r#"{"name": "app"}"#, &lockfile_with_left_pad());

        let config = YarnClassicBackend::new(Downloader::new()).build_config(&context);
        let names: Vec<&str> = config
            .environment_variables
            .iter()
            .map(|v| v.name.as_str())
            .collect();
        assert_eq!(
            names,
            ["YARN_YARN_OFFLINE_MIRROR", "YARN_YARN_OFFLINE_MIRROR_PRUNING"]
        );
        assert!(config.project_files.is_empty());
    }
}
