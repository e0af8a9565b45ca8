//! Placement of fetched artifacts inside the output directory.
//!
//! Each package manager gets its own subdirectory under `deps/` so the
//! generated build configuration can point the manager at exactly the
//! artifacts it owns. Destinations are anchored through
//! [`RootedPath::join_within_root`], which turns a hostile filename from
//! a lockfile into a fatal error instead of a write outside the output
//! directory.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use airlock_core::{Error, Result, RootedPath};
use airlock_workspaces::{LockfileEntry, PackageManager};

use crate::backend::PlannedArtifact;

/// Anchors artifact destinations under `deps/<package manager>`.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: RootedPath,
}

impl ArtifactStore {
    /// Create a store rooted at `output_dir/deps/<package manager>`.
    pub fn new(output_dir: &RootedPath, kind: PackageManager) -> Result<Self> {
        let dir = output_dir.join_within_root(PathBuf::from("deps").join(kind.as_str()))?;
        Ok(Self { dir })
    }

    /// The directory artifacts for this package manager land in.
    #[must_use]
    pub fn dir(&self) -> &RootedPath {
        &self.dir
    }

    /// Plan a download of `url` to `filename` inside the store.
    ///
    /// Fails with a containment error when `filename` resolves outside
    /// the store directory.
    pub fn plan(
        &self,
        entry: &LockfileEntry,
        url: impl Into<String>,
        filename: &str,
    ) -> Result<PlannedArtifact> {
        let destination = self.dir.join_within_root(filename)?;
        Ok(PlannedArtifact {
            package: entry.label(),
            url: url.into(),
            destination,
            checksums: entry.checksums.clone(),
        })
    }
}

/// Flattened tarball name for an npm or Yarn package.
///
/// Scoped names keep their `@` but swap the `/` for a `-` so the result
/// is a single path component: `@babel/core` at 7.22.5 becomes
/// `@babel-core-7.22.5.tgz`.
#[must_use]
pub fn tarball_filename(name: &str, version: &str) -> String {
    format!("{}-{version}.tgz", name.replace('/', "-"))
}

/// Collapse duplicate download plans and reject colliding ones.
///
/// Two plans for the same destination are fine when they agree on the
/// URL and checksums (the same package reached through two workspace
/// members). Disagreeing plans would silently overwrite each other, so
/// they fail the whole run.
pub fn dedup_artifacts(artifacts: Vec<PlannedArtifact>) -> Result<Vec<PlannedArtifact>> {
    let mut by_destination: BTreeMap<PathBuf, PlannedArtifact> = BTreeMap::new();
    let mut conflicts: BTreeSet<String> = BTreeSet::new();

    for artifact in artifacts {
        let destination = artifact.destination.path().to_path_buf();
        match by_destination.get(&destination) {
            None => {
                by_destination.insert(destination, artifact);
            }
            Some(existing)
                if existing.url == artifact.url && existing.checksums == artifact.checksums => {}
            Some(_) => {
                let name = destination
                    .file_name()
                    .map_or_else(|| destination.display().to_string(), |n| {
                        n.to_string_lossy().into_owned()
                    });
                conflicts.insert(name);
            }
        }
    }

    if conflicts.is_empty() {
        Ok(by_destination.into_values().collect())
    } else {
        Err(Error::DuplicateArtifacts {
            conflicts: conflicts.into_iter().collect(),
        })
    }
}
