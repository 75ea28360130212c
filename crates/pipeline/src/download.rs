//! Remote media download.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use clipcraft_common::error::DownloadError;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

/// Fetches a URL into a local file.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Download `url` to `destination`, returning the local path.
    async fn download_file(&self, url: &str, destination: &Path) -> Result<PathBuf, DownloadError>;
}

/// Default directory for downloaded overlay videos.
pub fn default_download_dir() -> PathBuf {
    std::env::temp_dir().join("clipcraft")
}

/// Timestamped destination for a downloaded video inside `dir`.
pub fn download_destination(dir: &Path) -> PathBuf {
    dir.join(format!("video_{}.mp4", Utc::now().timestamp_millis()))
}

/// [`Downloader`] over HTTP(S), streaming the body to disk.
#[derive(Debug, Clone, Default)]
pub struct HttpDownloader {
    client: reqwest::Client,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Removes a download target on drop unless kept. Covers error returns and
/// a download future dropped by cancellation.
struct PartialFile<'a> {
    path: &'a Path,
    keep: bool,
}

impl<'a> PartialFile<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path, keep: false }
    }

    fn keep(mut self) {
        self.keep = true;
    }
}

impl Drop for PartialFile<'_> {
    fn drop(&mut self) {
        if !self.keep && std::fs::remove_file(self.path).is_ok() {
            tracing::debug!(path = %self.path.display(), "Removed partial download");
        }
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download_file(&self, url: &str, destination: &Path) -> Result<PathBuf, DownloadError> {
        let io_err = |e: std::io::Error| DownloadError::Io {
            path: destination.to_path_buf(),
            message: e.to_string(),
        };
        let request_err = |e: reqwest::Error| DownloadError::Request {
            url: url.to_string(),
            message: e.to_string(),
        };

        tracing::info!(url, destination = %destination.display(), "Downloading");

        let response = self.client.get(url).send().await.map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        // Declared before the file so the handle closes before removal.
        let partial = PartialFile::new(destination);
        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(io_err)?;

        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(request_err)?;
            file.write_all(&chunk).await.map_err(io_err)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(io_err)?;
        drop(file);
        partial.keep();

        tracing::info!(url, bytes = written, "Download complete");
        Ok(destination.to_path_buf())
    }
}
