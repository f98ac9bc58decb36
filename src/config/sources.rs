//! Source list loading and validation.
//!
//! Sources are supplied externally as an ordered list of records in a TOML
//! file. The list is read once at run start; a malformed list aborts the
//! whole run before any processing begins.

use crate::error::{Result, SkrybaError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Kind of a configured origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// RSS/Atom feed listing items.
    Feed,
    /// Video-hosting channel, enumerated with an external tool.
    Channel,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Feed => write!(f, "feed"),
            SourceKind::Channel => write!(f, "channel"),
        }
    }
}

/// A configured origin from which candidate items are enumerated.
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub kind: SourceKind,
    /// Feed URL or channel URL.
    pub endpoint: String,
    /// Language priority list, most preferred first.
    pub languages: Vec<String>,
    /// Fixed inter-item delay, in seconds.
    #[serde(default = "default_pace_delay")]
    pub pace_delay_seconds: f64,
    /// Skip items longer than this many minutes.
    #[serde(default)]
    pub max_duration_minutes: Option<u32>,
    /// Skip items published before this date.
    #[serde(default)]
    pub published_after: Option<NaiveDate>,
    /// Attempt the platform auto-caption tier.
    #[serde(default = "default_true")]
    pub enable_auto_captions: bool,
    /// Attempt the audio-transcription tier.
    #[serde(default = "default_true")]
    pub enable_transcription_engine: bool,
}

fn default_pace_delay() -> f64 {
    1.5
}

fn default_true() -> bool {
    true
}

impl Source {
    pub fn pace_delay(&self) -> Duration {
        Duration::from_secs_f64(self.pace_delay_seconds.max(0.0))
    }

    /// The single language used by the audio-transcription tier.
    pub fn primary_language(&self) -> &str {
        &self.languages[0]
    }
}

#[derive(Debug, Deserialize)]
struct SourceFile {
    #[serde(default)]
    sources: Vec<Source>,
}

/// Load and validate the source list from a TOML file.
///
/// Any validation failure is a configuration error, fatal to the run.
pub fn load_sources(path: &Path) -> Result<Vec<Source>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SkrybaError::Config(format!("Cannot read source list {}: {}", path.display(), e))
    })?;
    let file: SourceFile = toml::from_str(&content)
        .map_err(|e| SkrybaError::Config(format!("Malformed source list: {}", e)))?;
    validate(file.sources)
}

fn validate(sources: Vec<Source>) -> Result<Vec<Source>> {
    if sources.is_empty() {
        return Err(SkrybaError::Config("Source list is empty".to_string()));
    }

    let mut seen_ids = HashSet::new();
    for source in &sources {
        if source.id.trim().is_empty() {
            return Err(SkrybaError::Config("Source with empty id".to_string()));
        }
        if !seen_ids.insert(source.id.as_str()) {
            return Err(SkrybaError::Config(format!(
                "Duplicate source id: {}",
                source.id
            )));
        }
        if source.languages.is_empty() {
            return Err(SkrybaError::Config(format!(
                "Source {} has an empty language list",
                source.id
            )));
        }
        Url::parse(&source.endpoint).map_err(|e| {
            SkrybaError::Config(format!(
                "Source {} has an invalid endpoint {}: {}",
                source.id, source.endpoint, e
            ))
        })?;
    }

    Ok(sources)
}
