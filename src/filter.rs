//! Metadata filtering.
//!
//! Fetches per-item metadata (duration, publish date) with a single cheap
//! lookup and applies the source's inclusion predicates before any expensive
//! resolution work runs.
//!
//! The policy on metadata-retrieval failure is permissive: absence of
//! information must not silently drop content, so the item is included. The
//! one exception is an explicit terminal signal (unavailable/private), which
//! skips the item outright with zero retries.

use crate::config::Source;
use crate::error::{classify_tool_failure, SkrybaError};
use crate::runner::ProcessRunner;
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Lazily populated item metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMetadata {
    pub duration_seconds: Option<u64>,
    pub published: Option<NaiveDate>,
}

/// Outcome of the metadata gate.
#[derive(Debug)]
pub enum FilterDecision {
    /// Proceed to resolution, with whatever metadata was obtained.
    Include(Option<ItemMetadata>),
    /// Skip the item before any tier runs.
    Skip(SkipReason),
}

#[derive(Debug, PartialEq, Eq)]
pub enum SkipReason {
    TooLong {
        duration_seconds: u64,
        max_minutes: u32,
    },
    TooOld {
        published: NaiveDate,
        cutoff: NaiveDate,
    },
    Unavailable,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::TooLong {
                duration_seconds,
                max_minutes,
            } => write!(f, "duration {}s exceeds {} min", duration_seconds, max_minutes),
            SkipReason::TooOld { published, cutoff } => {
                write!(f, "published {} before cutoff {}", published, cutoff)
            }
            SkipReason::Unavailable => write!(f, "item unavailable"),
        }
    }
}

pub struct MetadataFilter {
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
}

impl MetadataFilter {
    pub fn new(runner: Arc<dyn ProcessRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Evaluate the source's duration/date cutoffs for one item.
    pub async fn evaluate(&self, source: &Source, item_id: &str) -> FilterDecision {
        let metadata = match self.fetch_metadata(item_id).await {
            Ok(m) => m,
            Err(SkrybaError::Unavailable(msg)) => {
                debug!(item = item_id, "Terminal metadata failure: {}", msg);
                return FilterDecision::Skip(SkipReason::Unavailable);
            }
            Err(e) => {
                // Permissive: without metadata we cannot justify dropping
                // the item, so it proceeds to resolution.
                warn!(item = item_id, error = %e, "Metadata lookup failed, including item");
                return FilterDecision::Include(None);
            }
        };

        if let (Some(duration), Some(max_minutes)) =
            (metadata.duration_seconds, source.max_duration_minutes)
        {
            if duration > u64::from(max_minutes) * 60 {
                return FilterDecision::Skip(SkipReason::TooLong {
                    duration_seconds: duration,
                    max_minutes,
                });
            }
        }

        if let (Some(published), Some(cutoff)) = (metadata.published, source.published_after) {
            if published < cutoff {
                return FilterDecision::Skip(SkipReason::TooOld { published, cutoff });
            }
        }

        FilterDecision::Include(Some(metadata))
    }

    /// Single metadata lookup, no retries: a transient failure is already
    /// covered by the permissive-include policy.
    async fn fetch_metadata(&self, item_id: &str) -> crate::error::Result<ItemMetadata> {
        let url = format!("https://www.youtube.com/watch?v={}", item_id);
        let args = vec!["-j".to_string(), "--skip-download".to_string(), url];

        let output = self.runner.run("yt-dlp", &args, self.timeout).await?;
        if !output.success() {
            return Err(classify_tool_failure("metadata lookup", &output.stderr));
        }

        let first_line = output
            .stdout
            .lines()
            .next()
            .ok_or_else(|| SkrybaError::Parse("Empty metadata output".to_string()))?;
        let json: serde_json::Value = serde_json::from_str(first_line)
            .map_err(|e| SkrybaError::Parse(format!("Malformed metadata payload: {}", e)))?;

        let duration_seconds = json["duration"].as_f64().map(|d| d as u64);
        // Upload dates come back as YYYYMMDD.
        let published = json["upload_date"]
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y%m%d").ok());

        Ok(ItemMetadata {
            duration_seconds,
            published,
        })
    }
}
