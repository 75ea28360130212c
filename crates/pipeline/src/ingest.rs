//! Post ingestion providers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use clipcraft_common::error::ClipcraftResult;
use clipcraft_model::{IngestProviderKind, IngestSettings, PostData};

/// Caption returned by [`MockProvider`]. Contains characters the caption
/// renderer must escape, plus a line break.
pub const MOCK_CAPTION: &str =
    "This is a mock post.\nSome characters ffmpeg cares about: '\"\\, and a line break.";

const MOCK_DELAY: Duration = Duration::from_millis(500);

/// Fetches the latest post for a watch URL.
#[async_trait]
pub trait IngestProvider: Send + Sync {
    async fn get_latest_post(&self, url: &str) -> ClipcraftResult<PostData>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Directory holding the bundled mock assets.
pub fn mock_asset_dir(base_dir: &Path) -> PathBuf {
    base_dir.join("assets").join("mock")
}

/// Offline provider returning the bundled screenshot and clip.
#[derive(Debug, Clone)]
pub struct MockProvider {
    asset_dir: PathBuf,
    delay: Duration,
}

impl MockProvider {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            asset_dir: mock_asset_dir(base_dir.as_ref()),
            delay: MOCK_DELAY,
        }
    }

    /// Override the simulated network latency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl IngestProvider for MockProvider {
    async fn get_latest_post(&self, url: &str) -> ClipcraftResult<PostData> {
        tracing::info!(url, "MockProvider: providing mock data");
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let now = Utc::now();
        Ok(PostData {
            id: format!("mock-{}", now.timestamp_millis()),
            author: "Mock User".to_string(),
            text: MOCK_CAPTION.to_string(),
            screenshot_path: self.asset_dir.join("xpost.png"),
            video_path: Some(
                self.asset_dir
                    .join("short.mp4")
                    .to_string_lossy()
                    .into_owned(),
            ),
            created_at: now,
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Pick the provider configured in `settings`.
///
/// Scraping is not available in this build; requesting it falls back to
/// the mock provider.
pub fn provider_for(settings: &IngestSettings, base_dir: &Path) -> Arc<dyn IngestProvider> {
    if settings.provider == IngestProviderKind::Scrape {
        tracing::warn!(
            enabled = settings.scrape.enabled,
            "Scrape provider is unavailable, falling back to mock"
        );
    }
    Arc::new(MockProvider::new(base_dir))
}
