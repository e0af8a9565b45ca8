//! The fetch pipeline: resolve, plan, download, verify, emit.
//!
//! Outputs are staged so a failed run never leaves a usable-looking
//! output directory behind: the SBOM and build configuration are
//! written only after every artifact has been fetched and has passed
//! verification.

use std::path::PathBuf;
use std::sync::Arc;

use airlock_core::{Error, Result, RootedPath};
use airlock_sbom::Sbom;
use airlock_workspaces::PackageManager;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::backend::{PackageManagerBackend, PlannedArtifact, ProjectContext};
use crate::downloader::Downloader;
use crate::npm::NpmBackend;
use crate::pip::PipBackend;
use crate::yarn::YarnClassicBackend;

/// File name of the emitted bill of materials.
pub const SBOM_FILENAME: &str = "bom.json";

/// Default number of concurrent downloads.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Everything a fetch run needs to know.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// The ecosystem to fetch for.
    pub package_manager: PackageManager,
    /// The project to read manifests and lockfiles from.
    pub source_dir: PathBuf,
    /// Where artifacts, the SBOM, and the build configuration land.
    pub output_dir: PathBuf,
    /// Opt-in gate for backends that are not production-ready.
    pub dev_package_managers: bool,
    /// Download concurrency limit.
    pub max_concurrent: usize,
}

/// What a successful fetch produced.
#[derive(Debug, Clone)]
pub struct FetchReport {
    /// Number of artifacts downloaded and verified.
    pub artifact_count: usize,
    /// Path of the written SBOM.
    pub sbom_path: PathBuf,
    /// Path of the written build configuration.
    pub build_config_path: PathBuf,
}

/// Run a complete fetch: resolve the lockfile, download and verify
/// every artifact, then write the SBOM and build configuration.
pub async fn run_fetch(request: FetchRequest) -> Result<FetchReport> {
    // The pip backend has not seen enough real projects yet to be on by
    // default.
    if request.package_manager == PackageManager::Pip && !request.dev_package_managers {
        return Err(Error::UnsupportedPackageManager {
            manager: "pip (requires --dev-package-managers)".to_string(),
        });
    }

    if !request.source_dir.is_dir() {
        return Err(Error::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "no such directory"),
            &request.source_dir,
            "reading source directory",
        ));
    }
    std::fs::create_dir_all(&request.output_dir)
        .map_err(|e| Error::io_with_path(e, &request.output_dir, "creating output directory"))?;

    let project = ProjectContext {
        source_dir: RootedPath::new(&request.source_dir)?,
        output_dir: RootedPath::new(&request.output_dir)?,
    };

    let backend = backend_for(request.package_manager);
    let lockfile = backend.resolve_lockfile(&project)?;
    let artifacts = backend.list_artifacts(&project, &lockfile)?;
    let components = backend.components(&project, &lockfile)?;
    let build_config = backend.build_config(&project);

    info!(
        package_manager = %request.package_manager,
        artifacts = artifacts.len(),
        "Fetching dependencies"
    );
    fetch_all(Arc::clone(&backend), &artifacts, request.max_concurrent).await?;

    let sbom_path = project.output_dir.join_within_root(SBOM_FILENAME)?;
    Sbom::from_components(components).write(sbom_path.path())?;
    let build_config_path = build_config.write(&project.output_dir)?;

    info!("All dependencies fetched successfully");

    Ok(FetchReport {
        artifact_count: artifacts.len(),
        sbom_path: sbom_path.path().to_path_buf(),
        build_config_path,
    })
}

fn backend_for(kind: PackageManager) -> Arc<dyn PackageManagerBackend> {
    let downloader = Downloader::new();
    match kind {
        PackageManager::Npm => Arc::new(NpmBackend::new(downloader)),
        PackageManager::YarnClassic => Arc::new(YarnClassicBackend::new(downloader)),
        PackageManager::Pip => Arc::new(PipBackend::new(downloader)),
    }
}

/// Download and verify all artifacts with bounded concurrency.
///
/// An artifact that fails verification is removed from disk before the
/// error propagates.
async fn fetch_all(
    backend: Arc<dyn PackageManagerBackend>,
    artifacts: &[PlannedArtifact],
    max_concurrent: usize,
) -> Result<()> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut join_set = JoinSet::new();

    for artifact in artifacts {
        let permit = semaphore.clone().acquire_owned().await.map_err(|e| {
            Error::Io {
                source: std::io::Error::other(e.to_string()),
                path: None,
                operation: "acquiring download slot".to_string(),
            }
        })?;

        let backend = Arc::clone(&backend);
        let artifact = artifact.clone();

        join_set.spawn(async move {
            backend.fetch_artifact(&artifact).await?;

            let verified = backend.verify_artifact(&artifact);
            if verified.is_err() {
                let _ = tokio::fs::remove_file(artifact.destination.path()).await;
            } else {
                debug!(package = %artifact.package, "Verified artifact");
            }

            drop(permit);
            verified
        });
    }

    while let Some(result) = join_set.join_next().await {
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(e) => {
                return Err(Error::Io {
                    source: std::io::Error::other(e.to_string()),
                    path: None,
                    operation: "joining download task".to_string(),
                });
            }
        }
    }

    Ok(())
}
