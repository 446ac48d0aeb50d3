//! Downloading release indexes and runtime archives

use crate::core::PipelineError;
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Network side of the toolchain bootstrap
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// GET `url` and return the body as text
    async fn fetch_text(&self, url: &str) -> Result<String, PipelineError>;

    /// Download the `.tar.gz` at `url` and unpack it into `dest`
    async fn fetch_archive(
        &self,
        url: &str,
        dest: &Path,
        strip_components: usize,
    ) -> Result<(), PipelineError>;
}

/// [`Fetcher`] backed by reqwest and the system `tar`
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response, PipelineError> {
        self.client
            .get(url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| PipelineError::download(url, e))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, PipelineError> {
        debug!("Fetching {}", url);
        self.get(url)
            .await?
            .text()
            .await
            .map_err(|e| PipelineError::download(url, e))
    }

    async fn fetch_archive(
        &self,
        url: &str,
        dest: &Path,
        strip_components: usize,
    ) -> Result<(), PipelineError> {
        info!("Downloading {}", url);

        let parent = dest.parent().unwrap_or(dest);
        let archive = tempfile::Builder::new()
            .prefix(".download-")
            .suffix(".tar.gz")
            .tempfile_in(parent)?;

        let mut response = self.get(url).await?;
        let mut file = tokio::fs::File::create(archive.path()).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| PipelineError::download(url, e))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);
        debug!("Downloaded {} bytes from {}", written, url);

        extract_archive(archive.path(), dest, strip_components)
            .await
            .map_err(|reason| PipelineError::download(url, reason))
    }
}

/// Unpack a gzip'd tarball with the system `tar`
async fn extract_archive(
    archive: &Path,
    dest: &Path,
    strip_components: usize,
) -> Result<(), String> {
    let output = Command::new("tar")
        .arg("-xzf")
        .arg(archive)
        .arg("-C")
        .arg(dest)
        .arg(format!("--strip-components={}", strip_components))
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| format!("failed to run tar: {}", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(format!(
            "tar exited with code {}: {}",
            output.status.code().unwrap_or(-1),
            stderr.trim()
        ));
    }

    Ok(())
}
