//! pip backend.
//!
//! Serves projects whose `requirements.txt` pins every dependency as a
//! hashed direct URL. There is no separate manifest to reconcile
//! against, the requirements file is both declaration and pin, so
//! resolution is a single strict parse.

use airlock_core::{Error, Result};
use airlock_sbom::{Component, purl};
use airlock_workspaces::{
    DependencySource, LockfileEntry, LockfileParser, PackageManager, RequirementsParser,
};
use async_trait::async_trait;
use tracing::debug;

use crate::backend::{PackageManagerBackend, PlannedArtifact, ProjectContext, ResolvedLockfile};
use crate::downloader::Downloader;
use crate::output::{BuildConfig, EnvironmentVariable};
use crate::store::{ArtifactStore, dedup_artifacts};

/// Backend for projects managed with pip.
pub struct PipBackend {
    downloader: Downloader,
}

impl PipBackend {
    /// Create the backend around a shared download client.
    #[must_use]
    pub fn new(downloader: Downloader) -> Self {
        Self { downloader }
    }
}

#[async_trait]
impl PackageManagerBackend for PipBackend {
    fn kind(&self) -> PackageManager {
        PackageManager::Pip
    }

    fn downloader(&self) -> &Downloader {
        &self.downloader
    }

    fn resolve_lockfile(&self, project: &ProjectContext) -> Result<ResolvedLockfile> {
        let parser = RequirementsParser;
        let lockfile = project
            .source_dir
            .join_within_root(parser.lockfile_name())?;
        if !lockfile.path().is_file() {
            return Err(Error::LockfileNotFound {
                path: lockfile.path().to_path_buf(),
            });
        }

        let entries = parser.parse(lockfile.path())?;
        debug!(entries = entries.len(), "Resolved requirements.txt");

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
            let filename = url_filename(url).ok_or_else(|| {
                Error::lockfile_parse_failed(
                    lockfile.path.clone(),
                    format!("cannot derive a filename from URL {url} for \"{}\"", entry.name),
                )
            })?;
            planned.push(store.plan(entry, url, filename)?);
        }
        dedup_artifacts(planned)
    }

    fn components(
        &self,
        _project: &ProjectContext,
        lockfile: &ResolvedLockfile,
    ) -> Result<Vec<Component>> {
        Ok(lockfile.entries.iter().map(component_for).collect())
    }

    fn build_config(&self, _project: &ProjectContext) -> BuildConfig {
        BuildConfig {
            environment_variables: vec![
                EnvironmentVariable::path("PIP_FIND_LINKS", "deps/pip"),
                EnvironmentVariable::literal("PIP_NO_INDEX", "true"),
            ],
            project_files: Vec::new(),
        }
    }
}

fn component_for(entry: &LockfileEntry) -> Component {
    let checksum = entry.checksums.first().map(ToString::to_string);
    Component::library(
        entry.name.as_str(),
        entry.version.clone(),
        Some(purl::pypi(
            &entry.name,
            entry.version.as_deref(),
            checksum.as_deref(),
        )),
    )
}

/// Final path segment of a URL, without query or fragment.
fn url_filename(url: &str) -> Option<&str> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let without_query = without_fragment.split('?').next().unwrap_or(without_fragment);
    match without_query.rsplit('/').next() {
        Some("") | None => None,
        Some(name) => Some(name),
    }
}
