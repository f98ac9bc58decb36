//! Channel enumeration via yt-dlp.
//!
//! Primary strategy: list the channel's uploads playlist (resolved from the
//! channel's metadata when possible, since it is more stable than the
//! `/videos` page). Fallback: keyword search by source id, in the relevance
//! order the tool returns.

use super::{item_id_regex, CandidateItem};
use crate::config::Source;
use crate::error::{Result, SkrybaError};
use crate::runner::ProcessRunner;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct ChannelEnumerator {
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
    id_regex: Regex,
}

impl ChannelEnumerator {
    pub fn new(runner: Arc<dyn ProcessRunner>, timeout: Duration) -> Self {
        Self {
            runner,
            timeout,
            id_regex: item_id_regex(),
        }
    }

    pub async fn enumerate(&self, source: &Source, limit: usize) -> Result<Vec<CandidateItem>> {
        match self.list_uploads(source, limit).await {
            Ok(items) if !items.is_empty() => return Ok(items),
            Ok(_) => warn!(source = %source.id, "Channel listing returned no items"),
            Err(e) => warn!(source = %source.id, error = %e, "Channel listing failed"),
        }

        info!(source = %source.id, "Falling back to keyword search enumeration");
        match self.search(source, limit).await {
            Ok(items) if !items.is_empty() => Ok(items),
            Ok(_) => Err(SkrybaError::Enumeration(format!(
                "No items found for source {} ({})",
                source.id, source.endpoint
            ))),
            Err(e) => Err(SkrybaError::Enumeration(format!(
                "Both listing and search failed for source {}: {}",
                source.id, e
            ))),
        }
    }

    /// Primary strategy: flat-playlist listing of the channel uploads.
    async fn list_uploads(&self, source: &Source, limit: usize) -> Result<Vec<CandidateItem>> {
        let url = self
            .resolve_uploads_playlist(&source.endpoint)
            .await
            .unwrap_or_else(|| source.endpoint.clone());

        let args = vec![
            "--flat-playlist".to_string(),
            "--get-id".to_string(),
            "--playlist-end".to_string(),
            limit.to_string(),
            url,
        ];

        let output = self.runner.run("yt-dlp", &args, self.timeout).await?;
        if !output.success() {
            return Err(SkrybaError::Transient(format!(
                "yt-dlp listing failed: {}",
                output.stderr.trim()
            )));
        }

        Ok(self.collect_ids(source, output.stdout_lines(), limit))
    }

    /// Fallback strategy: keyword search, relevance-ordered.
    async fn search(&self, source: &Source, limit: usize) -> Result<Vec<CandidateItem>> {
        let args = vec![
            "--flat-playlist".to_string(),
            "--get-id".to_string(),
            format!("ytsearch{}:{}", limit, source.id),
        ];

        let output = self.runner.run("yt-dlp", &args, self.timeout).await?;
        if !output.success() {
            return Err(SkrybaError::Transient(format!(
                "yt-dlp search failed: {}",
                output.stderr.trim()
            )));
        }

        Ok(self.collect_ids(source, output.stdout_lines(), limit))
    }

    /// Resolve the uploads playlist URL (`UU` + channel id without `UC`).
    ///
    /// Returns None when the channel id cannot be obtained; the caller then
    /// lists the endpoint URL directly.
    async fn resolve_uploads_playlist(&self, endpoint: &str) -> Option<String> {
        let args = vec!["-j".to_string(), endpoint.to_string()];
        let output = match self.runner.run("yt-dlp", &args, self.timeout).await {
            Ok(o) if o.success() => o,
            _ => return None,
        };

        let first_line = output.stdout.lines().next()?;
        let json: serde_json::Value = serde_json::from_str(first_line).ok()?;
        let channel_id = json["channel_id"].as_str()?;
        if let Some(suffix) = channel_id.strip_prefix("UC") {
            if !suffix.is_empty() {
                let url = format!("https://www.youtube.com/playlist?list=UU{}", suffix);
                debug!("Resolved uploads playlist {}", url);
                return Some(url);
            }
        }
        None
    }

    fn collect_ids(&self, source: &Source, lines: Vec<String>, limit: usize) -> Vec<CandidateItem> {
        let mut items = Vec::new();
        for line in lines {
            if items.len() >= limit {
                break;
            }
            if self.id_regex.is_match(&line) {
                items.push(CandidateItem::new(&source.id, &line));
            } else {
                debug!(source = %source.id, "Dropping malformed item id {:?}", line);
            }
        }
        items
    }
}
