//! HTTP downloads for url spells.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::Path;
use tokio::io::AsyncWriteExt;

use crate::constants::DOWNLOAD_TIMEOUT;
use crate::core::CredoError;

/// Fetches a remote resource into a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` into `dest`, replacing it. Returns the number of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// [`Downloader`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    /// Build a client with the credo user agent and the default download timeout.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("credo/", env!("CARGO_PKG_VERSION")))
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
        })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64> {
        tracing::debug!(target: "download", "GET {}", url);

        let failed = |reason: String| CredoError::DownloadFailed {
            url: url.to_string(),
            reason,
        };

        let response = self.client.get(url).send().await.map_err(|e| failed(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failed(format!("HTTP {status}")).into());
        }

        let bytes = response.bytes().await.map_err(|e| failed(e.to_string()))?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create file: {}", dest.display()))?;
        file.write_all(&bytes)
            .await
            .with_context(|| format!("Failed to write file: {}", dest.display()))?;
        file.flush().await?;

        tracing::debug!(target: "download", "Wrote {} bytes to {}", bytes.len(), dest.display());
        Ok(bytes.len() as u64)
    }
}
