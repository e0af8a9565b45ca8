//! Dependency prefetching for hermetic builds.
//!
//! Each supported package manager implements
//! [`PackageManagerBackend`], the capability interface the pipeline
//! drives: resolve the lockfile, plan artifacts, fetch them, verify
//! them against the lockfile's pins. A run that completes writes a
//! CycloneDX SBOM and a build configuration into the output directory;
//! a run that fails writes neither.
//!
//! The [`emit`] module consumes a previous run's outputs to produce the
//! environment script and injected project files an offline build
//! needs.

pub mod backend;
pub mod downloader;
pub mod emit;
pub mod npm;
pub mod output;
pub mod pip;
pub mod pipeline;
pub mod store;
pub mod yarn;

pub use backend::{PackageManagerBackend, PlannedArtifact, ProjectContext, ResolvedLockfile};
pub use downloader::Downloader;
pub use emit::{generate_env, inject_files};
pub use npm::NpmBackend;
pub use output::{BUILD_CONFIG_FILENAME, BuildConfig, EnvKind, EnvironmentVariable, ProjectFile};
pub use pip::PipBackend;
pub use pipeline::{
    DEFAULT_MAX_CONCURRENT, FetchReport, FetchRequest, SBOM_FILENAME, run_fetch,
};
pub use store::{ArtifactStore, dedup_artifacts, tarball_filename};
pub use yarn::YarnClassicBackend;
