//! Persisted application settings.
//!
//! This structure is stored as `config.json`. Every section has a default,
//! so partially written files still load.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Current settings schema version.
pub const SETTINGS_SCHEMA_VERSION: &str = "1.0.0";

/// Top-level settings file (`config.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Schema version.
    pub schema_version: String,

    /// Output location, log level, and watch target.
    pub general: GeneralSettings,

    /// Which provider fetches posts.
    pub ingest: IngestSettings,

    /// Composition and encoding style.
    pub render: RenderSettings,

    /// Periodic pipeline runs.
    pub scheduler: SchedulerSettings,
}

/// General settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralSettings {
    /// Directory rendered videos are written to.
    pub output_path: PathBuf,

    /// Log level filter (e.g., "info", "debug").
    pub log_level: String,

    /// UI locale.
    pub locale: String,

    /// Account or post URL polled by the scheduler.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watch_url: Option<String>,
}

/// Ingest provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IngestSettings {
    /// Provider to use.
    pub provider: IngestProviderKind,

    /// Scraping options, only read when `provider` is `scrape`.
    pub scrape: ScrapeSettings,
}

/// Available ingest providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestProviderKind {
    /// Offline provider returning bundled assets.
    #[default]
    Mock,
    /// Headless-browser scraping.
    Scrape,
}

/// Scraping options.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScrapeSettings {
    /// Whether scraping is enabled at all.
    pub enabled: bool,

    /// Authentication cookie header.
    pub cookie: String,
}

/// How the composition is laid out and encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RenderSettings {
    /// Background clip defining the canvas. Empty means the bundled clip.
    pub background_video_path: PathBuf,

    /// Loop the background for as long as the overlays run.
    pub loop_background: bool,

    /// Anchor for the screenshot and overlay video.
    pub overlay_position: OverlayPosition,

    /// Encoding speed/quality tradeoff.
    pub quality_preset: QualityPreset,

    /// Caption box styling.
    pub text_overlay: TextOverlayStyle,
}

/// Named placement rule for overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverlayPosition {
    #[default]
    Center,
    TopCenter,
    BottomCenter,
    /// Declared for settings compatibility; placement is not implemented.
    Custom,
}

impl OverlayPosition {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Center => "center",
            Self::TopCenter => "top-center",
            Self::BottomCenter => "bottom-center",
            Self::Custom => "custom",
        }
    }
}

/// User-facing encoding preset.
///
/// Unrecognized names deserialize to [`QualityPreset::Standard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QualityPreset {
    Low,
    #[default]
    Standard,
    High,
}

impl QualityPreset {
    /// Lenient parse; anything unknown is `Standard`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Standard,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Standard => "standard",
            Self::High => "high",
        }
    }
}

impl From<String> for QualityPreset {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<QualityPreset> for String {
    fn from(value: QualityPreset) -> Self {
        value.as_str().to_string()
    }
}

/// Caption box styling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextOverlayStyle {
    /// Font size in pixels.
    pub font_size: u32,

    /// Opacity of the caption box [0.0, 1.0].
    pub box_opacity: f64,

    /// Padding around the caption text in pixels.
    pub box_padding: u32,

    /// Font file handed to the text renderer. `None` uses the renderer default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_file: Option<PathBuf>,
}

impl TextOverlayStyle {
    /// Box opacity clamped to [0.0, 1.0].
    pub fn clamped_opacity(&self) -> f64 {
        if self.box_opacity.is_nan() {
            0.0
        } else {
            self.box_opacity.clamp(0.0, 1.0)
        }
    }
}

/// Longest accepted scheduler interval: one year.
pub const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

/// Scheduler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerSettings {
    /// Run the pipeline periodically.
    pub enabled: bool,

    /// Minutes between runs.
    pub interval_minutes: u64,
}

impl SchedulerSettings {
    /// Effective interval between runs, between one minute and one year.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.clamp(1, MAX_INTERVAL_MINUTES) * 60)
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            schema_version: SETTINGS_SCHEMA_VERSION.to_string(),
            general: GeneralSettings::default(),
            ingest: IngestSettings::default(),
            render: RenderSettings::default(),
            scheduler: SchedulerSettings::default(),
        }
    }
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./output"),
            log_level: "info".to_string(),
            locale: "ja".to_string(),
            watch_url: Some("https://twitter.com/username".to_string()),
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            provider: IngestProviderKind::Mock,
            scrape: ScrapeSettings::default(),
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            background_video_path: PathBuf::from("./assets/mock/short.mp4"),
            loop_background: true,
            overlay_position: OverlayPosition::Center,
            quality_preset: QualityPreset::Standard,
            text_overlay: TextOverlayStyle::default(),
        }
    }
}

impl Default for TextOverlayStyle {
    fn default() -> Self {
        Self {
            font_size: 48,
            box_opacity: 0.8,
            box_padding: 20,
            font_file: None,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_minutes: 60,
        }
    }
}
