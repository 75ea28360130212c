//! Settings persistence and logging configuration.

use std::path::{Path, PathBuf};

use clipcraft_model::AppSettings;
use serde::{Deserialize, Serialize};

/// Name of the settings file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Loads and saves [`AppSettings`] as pretty-printed JSON.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    dir: PathBuf,
}

impl SettingsStore {
    /// Store rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store at the standard per-user location.
    pub fn default_location() -> Self {
        Self::new(default_config_dir())
    }

    /// Directory holding the settings file.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the settings file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// Load settings.
    ///
    /// A missing file is created with defaults. A file that cannot be read
    /// or parsed is left untouched and defaults are returned.
    pub fn load(&self) -> AppSettings {
        let config_path = self.path();
        if !config_path.exists() {
            let defaults = AppSettings::default();
            if let Err(e) = self.save(&defaults) {
                tracing::warn!("Failed to write default config at {:?}: {}", config_path, e);
            }
            return defaults;
        }

        match std::fs::read_to_string(&config_path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => return settings,
                Err(e) => {
                    tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
            }
        }
        AppSettings::default()
    }

    /// Save settings, creating the directory if needed.
    pub fn save(&self, settings: &AppSettings) -> Result<(), std::io::Error> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
        std::fs::write(self.path(), json)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "clipcraft=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Logging configuration matching the persisted settings.
    pub fn from_settings(settings: &AppSettings) -> Self {
        Self {
            level: settings.general.log_level.clone(),
            json: false,
        }
    }
}

/// Standard config directory.
fn default_config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("clipcraft")
}
