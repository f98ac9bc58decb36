//! Configuration settings for Skryba.

use crate::pacing::BackoffPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub fetch: FetchSettings,
    pub retry: RetrySettings,
    pub transcription: TranscriptionSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data (output logs live under it).
    pub data_dir: String,
    /// Directory for temporary files (downloaded audio, caption files).
    pub temp_dir: String,
    /// Path to the source list file.
    pub sources_file: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.skryba".to_string(),
            temp_dir: "/tmp/skryba".to_string(),
            sources_file: "~/.skryba/sources.toml".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Settings for enumeration, metadata and download operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    /// How many of the most recent items to enumerate per source.
    pub item_limit: usize,
    /// Timeout for listing a channel's items.
    pub list_timeout_seconds: u64,
    /// Timeout for a single item's metadata lookup.
    pub metadata_timeout_seconds: u64,
    /// Timeout for a caption file download.
    pub caption_timeout_seconds: u64,
    /// Timeout for an audio download.
    pub audio_timeout_seconds: u64,
    /// Timeout for fetching a feed or a transcript over HTTP.
    pub http_timeout_seconds: u64,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            item_limit: 5,
            list_timeout_seconds: 20,
            metadata_timeout_seconds: 30,
            caption_timeout_seconds: 60,
            audio_timeout_seconds: 120,
            http_timeout_seconds: 30,
        }
    }
}

/// Retry/backoff settings for transient failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Maximum attempts per operation, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt, in seconds.
    pub base_delay_seconds: f64,
    /// Backoff multiplier between attempts.
    pub multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_seconds: 1.0,
            multiplier: 2.0,
        }
    }
}

impl RetrySettings {
    /// Build a [`BackoffPolicy`], clamping degenerate values the file may
    /// carry: at least one attempt, a non-negative finite base delay, and a
    /// multiplier of at least 1.0.
    pub fn policy(&self) -> BackoffPolicy {
        let defaults = RetrySettings::default();
        let base_delay = if self.base_delay_seconds.is_finite() {
            self.base_delay_seconds.max(0.0)
        } else {
            defaults.base_delay_seconds
        };
        let multiplier = if self.multiplier.is_finite() {
            self.multiplier.max(1.0)
        } else {
            defaults.multiplier
        };

        BackoffPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(base_delay),
            multiplier,
        }
    }
}

/// Transcription engine settings (last-resort tier).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Whisper model to use.
    pub model: String,
    /// API request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            model: "whisper-1".to_string(),
            timeout_seconds: 300,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SkrybaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("skryba")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }

    /// Get the expanded source list path.
    pub fn sources_file(&self) -> PathBuf {
        Self::expand_path(&self.general.sources_file)
    }

    /// Directory holding the per-source output logs.
    pub fn output_dir(&self) -> PathBuf {
        self.data_dir().join("transcripts")
    }
}
