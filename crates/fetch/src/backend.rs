//! The capability interface every package manager backend implements.
//!
//! A backend contributes four stages to the pipeline: resolving its
//! lockfile against the project manifest, planning the artifacts to
//! download, producing SBOM components, and declaring the build
//! configuration that lets the package manager run offline. Downloading
//! and verification are shared across backends through the provided
//! trait methods.

use airlock_core::{Algorithm, Checksum, Error, Result, RootedPath};
use airlock_sbom::Component;
use airlock_workspaces::{LockfileEntry, PackageManager};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::downloader::Downloader;
use crate::output::BuildConfig;

/// The directories a fetch request operates on.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Root of the project being processed.
    pub source_dir: RootedPath,
    /// Directory all outputs are written into.
    pub output_dir: RootedPath,
}

/// A lockfile parsed and validated against the project manifest.
#[derive(Debug)]
pub struct ResolvedLockfile {
    /// Path the lockfile was read from.
    pub path: PathBuf,
    /// Every dependency the lockfile pins.
    pub entries: Vec<LockfileEntry>,
}

/// One artifact to download and verify.
#[derive(Debug, Clone)]
pub struct PlannedArtifact {
    /// `name@version` label used in logs and integrity errors.
    pub package: String,
    /// Where the artifact is downloaded from.
    pub url: String,
    /// Destination file, contained in the output directory.
    pub destination: RootedPath,
    /// Checksums pinned for the artifact; one match passes verification.
    pub checksums: Vec<Checksum>,
}

/// Capabilities a package manager backend provides to the pipeline.
#[async_trait]
pub trait PackageManagerBackend: Send + Sync {
    /// The package manager this backend serves.
    fn kind(&self) -> PackageManager;

    /// The shared download client.
    fn downloader(&self) -> &Downloader;

    /// Reads the lockfile and checks it is in sync with the manifest.
    fn resolve_lockfile(&self, project: &ProjectContext) -> Result<ResolvedLockfile>;

    /// Plans the artifacts the resolved entries require, with
    /// destinations inside the output directory.
    fn list_artifacts(
        &self,
        project: &ProjectContext,
        lockfile: &ResolvedLockfile,
    ) -> Result<Vec<PlannedArtifact>>;

    /// SBOM components for the project and everything the lockfile pins.
    fn components(
        &self,
        project: &ProjectContext,
        lockfile: &ResolvedLockfile,
    ) -> Result<Vec<Component>>;

    /// Environment variables and project files a build needs in order to
    /// consume the prefetched dependencies offline.
    fn build_config(&self, project: &ProjectContext) -> BuildConfig;

    /// Downloads one artifact to its planned destination.
    async fn fetch_artifact(&self, artifact: &PlannedArtifact) -> Result<()> {
        self.downloader().fetch(artifact).await
    }

    /// Verifies a downloaded artifact against its pins.
    fn verify_artifact(&self, artifact: &PlannedArtifact) -> Result<()> {
        verify_against_any(artifact)
    }
}

/// Checks the artifact on disk against its pinned checksums, passing on
/// the first match. Each algorithm is hashed at most once.
fn verify_against_any(artifact: &PlannedArtifact) -> Result<()> {
    let mut computed: BTreeMap<Algorithm, String> = BTreeMap::new();
    for checksum in &artifact.checksums {
        if !computed.contains_key(&checksum.algorithm()) {
            let digest = checksum
                .algorithm()
                .hash_file(artifact.destination.path())?;
            computed.insert(checksum.algorithm(), digest);
        }
        if computed[&checksum.algorithm()] == checksum.digest() {
            return Ok(());
        }
    }

    match artifact.checksums.first() {
        Some(first) => Err(Error::integrity(
            artifact.package.as_str(),
            first.to_string(),
            format!("{}:{}", first.algorithm(), computed[&first.algorithm()]),
        )),
        // Parsers reject unpinned registry entries, so planned artifacts
        // always carry at least one checksum.
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn artifact_with(dir: &TempDir, content: &[u8], checksums: Vec<Checksum>) -> PlannedArtifact {
        let path = dir.path().join("artifact.tgz");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content).unwrap();
        let root = RootedPath::new(dir.path()).unwrap();
        PlannedArtifact {
            package: "pkg@1.0.0".to_string(),
            url: "https://example.com/artifact.tgz".to_string(),
            destination: root.join_within_root("artifact.tgz").unwrap(),
            checksums,
        }
    }

    fn checksum_of(content: &[u8]) -> Checksum {
        use sha2::Digest as _;
        let digest = format!("{:x}", sha2::Sha256::digest(content));
        Checksum::from_hex(Algorithm::Sha256, &digest).unwrap()
    }

    #[test]
    fn verification_passes_when_any_pin_matches() {
        let dir = TempDir::new().unwrap();
        let wrong = checksum_of(b"other content");
        let right = checksum_of(b"real content");
        let artifact = artifact_with(&dir, b"real content", vec![wrong, right]);

        assert!(verify_against_any(&artifact).is_ok());
    }

    #[test]
    fn verification_failure_names_the_package() {
        let dir = TempDir::new().unwrap();
        let wrong = checksum_of(b"expected content");
        let artifact = artifact_with(&dir, b"tampered content", vec![wrong]);

        let err = verify_against_any(&artifact).unwrap_err();
        assert!(
            err.to_string()
                .contains("Integrity check failed for \"pkg@1.0.0\"")
        );
    }
}
