//! HTTP and local-file artifact downloads.
//!
//! Every artifact lands on disk through a write-to-temp-then-rename
//! sequence so a crashed or cancelled fetch never leaves a partial file
//! at the final destination.

use std::path::{Path, PathBuf};

use airlock_core::{Error, Result};
use reqwest::Client;
use tracing::debug;

use crate::backend::PlannedArtifact;

/// User agent sent with every registry request.
const USER_AGENT: &str = concat!("airlock/", env!("CARGO_PKG_VERSION"));

/// Downloads planned artifacts into the output directory.
///
/// Shared across backends so connection pooling works across an entire
/// fetch run.
pub struct Downloader {
    client: Client,
}

impl Default for Downloader {
    fn default() -> Self {
        Self::new()
    }
}

impl Downloader {
    /// Create a downloader with a pooled HTTP client.
    ///
    /// # Panics
    ///
    /// This function uses `expect` internally because `reqwest::Client::builder().build()`
    /// only fails with invalid TLS configuration, which cannot happen with default settings.
    #[must_use]
    pub fn new() -> Self {
        // SAFETY: Client::builder().build() only fails if:
        // 1. TLS backend fails to initialize (system-level issue)
        // 2. Invalid proxy configuration (we don't set any)
        // With default settings and user_agent only, this cannot fail.
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to create HTTP client - TLS backend initialization failed");

        Self { client }
    }

    /// Download one artifact to its planned destination.
    ///
    /// Supports `https://`, `http://`, and `file://` URLs. The
    /// destination's parent directories are created as needed.
    pub async fn fetch(&self, artifact: &PlannedArtifact) -> Result<()> {
        let destination = artifact.destination.path();

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::io_with_path(e, parent, "creating artifact directory")
            })?;
        }

        if let Some(local) = artifact.url.strip_prefix("file://") {
            self.copy_local(Path::new(local), destination, &artifact.package)
                .await
        } else if artifact.url.starts_with("https://") || artifact.url.starts_with("http://") {
            self.download_http(&artifact.url, destination, &artifact.package)
                .await
        } else {
            Err(Error::network(
                artifact.url.clone(),
                format!(
                    "unsupported URL scheme for \"{}\"; only http(s):// and file:// are fetchable",
                    artifact.package
                ),
            ))
        }
    }

    async fn download_http(&self, url: &str, destination: &Path, package: &str) -> Result<()> {
        debug!(%url, package, "Downloading artifact");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::network(url, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::network(
                url,
                format!("unexpected status {} for \"{package}\"", response.status()),
            ));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::network(url, format!("failed to read response body: {e}")))?;

        write_atomically(destination, &body).await
    }

    async fn copy_local(&self, source: &Path, destination: &Path, package: &str) -> Result<()> {
        debug!(source = %source.display(), package, "Copying local artifact");

        let body = tokio::fs::read(source)
            .await
            .map_err(|e| Error::io_with_path(e, source, "reading local artifact"))?;

        write_atomically(destination, &body).await
    }
}

/// Write `body` next to `destination` and rename it into place.
async fn write_atomically(destination: &Path, body: &[u8]) -> Result<()> {
    let temp_path = part_path(destination);

    tokio::fs::write(&temp_path, body)
        .await
        .map_err(|e| Error::io_with_path(e, &temp_path, "writing artifact"))?;

    tokio::fs::rename(&temp_path, destination)
        .await
        .map_err(|e| Error::io_with_path(e, destination, "moving artifact into place"))
}

fn part_path(destination: &Path) -> PathBuf {
    let mut name = destination.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}
