//! npm backend.
//!
//! Plans one tarball download per registry entry in
//! `package-lock.json`, reports every pinned package in the SBOM, and
//! points `npm` at the prefetched cache directory for the offline
//! install.

use std::collections::HashSet;
use std::path::PathBuf;

use airlock_core::{Error, Result};
use airlock_sbom::{Component, Property, purl};
use airlock_workspaces::{
    DependencySource, LockfileEntry, LockfileParser, NpmLockfileParser, PackageJson,
    PackageManager, extract_workspace_metadata,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::backend::{PackageManagerBackend, PlannedArtifact, ProjectContext, ResolvedLockfile};
use crate::downloader::Downloader;
use crate::output::{BuildConfig, EnvironmentVariable, ProjectFile};
use crate::store::{ArtifactStore, dedup_artifacts, tarball_filename};

/// SBOM property marking development dependencies.
const DEV_PROPERTY: &str = "cdx:npm:package:development";
/// SBOM property marking dependencies shipped inside another package's
/// tarball.
const BUNDLED_PROPERTY: &str = "cdx:npm:package:bundled";

/// Backend for projects managed with npm.
pub struct NpmBackend {
    downloader: Downloader,
}

impl NpmBackend {
    /// Create the backend around a shared download client.
    #[must_use]
    pub fn new(downloader: Downloader) -> Self {
        Self { downloader }
    }
}

#[async_trait]
impl PackageManagerBackend for NpmBackend {
    fn kind(&self) -> PackageManager {
        PackageManager::Npm
    }

    fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    fn resolve_lockfile(&self, project: &ProjectContext) -> Result<ResolvedLockfile> {
        let parser = NpmLockfileParser;
        let lockfile = project
            .source_dir
            .join_within_root(parser.lockfile_name())?;
        if !lockfile.path().is_file() {
            return Err(Error::LockfileNotFound {
                path: lockfile.path().to_path_buf(),
            });
        }

        let entries = parser.parse(lockfile.path())?;
        check_lockfile_covers_manifests(project, &entries)?;
        debug!(entries = entries.len(), "Resolved package-lock.json");

        Ok(ResolvedLockfile {
            path: lockfile.path().to_path_buf(),
            entries,
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
        _project: &ProjectContext,
        lockfile: &ResolvedLockfile,
    ) -> Result<Vec<Component>> {
        // The lockfile's packages map already covers the project root and
        // workspace members, so every component comes from the entries.
        Ok(lockfile.entries.iter().map(component_for).collect())
    }

    fn build_config(&self, _project: &ProjectContext) -> BuildConfig {
        BuildConfig {
            environment_variables: vec![EnvironmentVariable::path("npm_config_cache", "deps/npm")],
            project_files: vec![ProjectFile {
                relative_path: PathBuf::from(".npmrc"),
                template: "cache=\"${output_dir}/deps/npm\"\n".to_string(),
            }],
        }
    }
}

fn component_for(entry: &LockfileEntry) -> Component {
    let mut component = Component::library(
        entry.name.as_str(),
        entry.version.clone(),
        Some(purl::npm(&entry.name, entry.version.as_deref())),
    );
    if entry.dev {
        component
            .properties
            .push(Property::new(DEV_PROPERTY, "true"));
    }
    if entry.source == DependencySource::Bundled {
        component
            .properties
            .push(Property::new(BUNDLED_PROPERTY, "true"));
    }
    component
}

/// Every dependency declared in the root manifest or a workspace member
/// manifest must be pinned by the lockfile.
fn check_lockfile_covers_manifests(
    project: &ProjectContext,
    entries: &[LockfileEntry],
) -> Result<()> {
    let manifest_path = project.source_dir.join_within_root("package.json")?;
    let mut manifests = vec![PackageJson::load(manifest_path.path())?];
    for workspace in extract_workspace_metadata(&project.source_dir)? {
        manifests.push(workspace.manifest);
    }

    let pinned: HashSet<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    for manifest in &manifests {
        for (name, range) in manifest.declared_dependencies() {
            // Aliased dependencies ("foo": "npm:bar@^1.0") are pinned
            // under the aliased package's real name.
            if range.starts_with("npm:") {
                continue;
            }
            if !pinned.contains(name.as_str()) {
                warn!(
                    package = %name,
                    "Dependency declared in package.json but missing from package-lock.json"
                );
                return Err(Error::LockfileConsistency {
                    manager: "npm".to_string(),
                });
            }
        }
    }
    Ok(())
}
