//! Media fetching.
//!
//! [`MediaSource`] is the seam to the remote media host; [`HttpSource`] is the
//! production implementation that streams a response body straight to disk.
//! [`MediaFetcher`] pairs a source with the scratch space so every download
//! lands in a freshly allocated scratch file.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};
use crate::metrics;
use crate::scratch::{ScratchFile, ScratchSpace};

/// Suffix for downloaded source clips.
pub const DOWNLOAD_SUFFIX: &str = ".mp4";

/// Remote media source.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Write the resource at `url` to `dest`, returning the number of bytes written.
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<u64>;
}

/// HTTP(S) media source backed by a shared reqwest client.
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    max_bytes: Option<u64>,
}

impl HttpSource {
    /// Wrap an existing client.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            max_bytes: None,
        }
    }

    /// Build a client with the given connect timeout.
    pub fn with_connect_timeout(timeout: Duration) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .user_agent(concat!("mclip/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| MediaError::internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::new(client))
    }

    /// Reject bodies larger than `max_bytes`.
    pub fn with_max_bytes(mut self, max_bytes: Option<u64>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    fn check_limit(&self, url: &str, bytes: u64) -> MediaResult<()> {
        match self.max_bytes {
            Some(max) if bytes > max => Err(MediaError::download_failed(format!(
                "{} exceeds the download limit of {} bytes",
                url, max
            ))),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl MediaSource for HttpSource {
    async fn fetch(&self, url: &str, dest: &Path) -> MediaResult<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::download_failed(format!("Failed to download video: {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::download_failed(format!(
                "Failed to download video: {} (HTTP {})",
                url, status
            )));
        }

        if let Some(length) = response.content_length() {
            self.check_limit(url, length)?;
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                MediaError::download_failed(format!("Transfer interrupted for {}: {}", url, e))
            })?;
            written += chunk.len() as u64;
            self.check_limit(url, written)?;
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(written)
    }
}

/// Downloads clips into scratch storage.
#[derive(Clone)]
pub struct MediaFetcher {
    source: Arc<dyn MediaSource>,
    scratch: ScratchSpace,
}

impl MediaFetcher {
    pub fn new(source: Arc<dyn MediaSource>, scratch: ScratchSpace) -> Self {
        Self { source, scratch }
    }

    /// Download `url` into a new scratch file.
    ///
    /// On failure the partially written file is removed with the handle.
    pub async fn fetch(&self, url: &str) -> MediaResult<ScratchFile> {
        let file = self.scratch.allocate(DOWNLOAD_SUFFIX);
        let started = Instant::now();

        debug!("Downloading {} to {}", url, file.path().display());
        let bytes = self.source.fetch(url, file.path()).await?;

        let elapsed = started.elapsed().as_secs_f64();
        metrics::record_stage_duration("download", elapsed);
        info!(
            "Downloaded {} ({} bytes in {:.2}s) to {}",
            url,
            bytes,
            elapsed,
            file.path().display()
        );
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_source_writes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4096]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("clip.mp4");
        let source = HttpSource::new(reqwest::Client::new());

        let written = source
            .fetch(&format!("{}/clip.mp4", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(written, 4096);
        assert_eq!(tokio::fs::read(&dest).await.unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn test_http_source_rejects_non_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let source = HttpSource::new(reqwest::Client::new());
        let err = source
            .fetch(&format!("{}/missing.mp4", server.uri()), &dir.path().join("x.mp4"))
            .await
            .unwrap_err();

        match err {
            MediaError::DownloadFailed { message } => assert!(message.contains("404")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_source_enforces_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let source = HttpSource::new(reqwest::Client::new()).with_max_bytes(Some(1024));
        let err = source
            .fetch(&format!("{}/big.mp4", server.uri()), &dir.path().join("big.mp4"))
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::DownloadFailed { .. }));
    }

    #[tokio::test]
    async fn test_fetcher_cleans_up_failed_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let source = HttpSource::new(reqwest::Client::new()).with_max_bytes(Some(16));
        let fetcher = MediaFetcher::new(Arc::new(source), ScratchSpace::new(dir.path()));

        assert!(fetcher.fetch(&format!("{}/a.mp4", server.uri())).await.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
