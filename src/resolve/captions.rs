//! Platform auto-caption download and plain-text extraction (tier 3).
//!
//! Caption files come down as VTT or SRT; the extraction step strips timing
//! cues, sequence numbers and markup, leaving plain text.

use crate::error::{classify_tool_failure, Result};
use crate::runner::ProcessRunner;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct CaptionFetcher {
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
    temp_dir: std::path::PathBuf,
}

impl CaptionFetcher {
    pub fn new(runner: Arc<dyn ProcessRunner>, timeout: Duration, temp_dir: &Path) -> Self {
        Self {
            runner,
            timeout,
            temp_dir: temp_dir.to_path_buf(),
        }
    }

    /// Download the auto-caption track for one language and extract its text.
    ///
    /// Returns Ok(None) when no caption track exists for the language.
    pub async fn fetch(&self, item_id: &str, language: &str) -> Result<Option<String>> {
        let workdir = tempfile::tempdir_in(&self.temp_dir)?;
        let template = workdir
            .path()
            .join(format!("{}.{}.%(ext)s", item_id, language));
        let url = format!("https://www.youtube.com/watch?v={}", item_id);

        let args = vec![
            "--skip-download".to_string(),
            "--write-auto-sub".to_string(),
            "--sub-lang".to_string(),
            language.to_string(),
            "--sub-format".to_string(),
            "vtt/srt".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            url,
        ];

        let output = self.runner.run("yt-dlp", &args, self.timeout).await?;
        if !output.success() {
            return Err(classify_tool_failure("caption download", &output.stderr));
        }

        for ext in ["vtt", "srt"] {
            let path = workdir.path().join(format!("{}.{}.{}", item_id, language, ext));
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            let text = extract_caption_text(&content);
            if text.is_empty() {
                warn!(item = item_id, language, "Caption file contained no text");
                continue;
            }
            return Ok(Some(text));
        }

        debug!(item = item_id, language, "No caption track available");
        Ok(None)
    }
}

/// Strip a VTT/SRT payload down to plain text.
///
/// Drops blank lines, bare sequence numbers, cue timing lines and markup
/// tags, then joins what remains with spaces.
pub fn extract_caption_text(content: &str) -> String {
    let time_prefix = Regex::new(r"^\d{1,2}:\d{2}:\d{2}").expect("Invalid regex");
    let vtt_time_prefix = Regex::new(r"^\d{2}:\d{2}\.\d{3}").expect("Invalid regex");
    let tag = Regex::new(r"<[^>]+>").expect("Invalid regex");

    let mut parts: Vec<String> = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty()
            || line == "WEBVTT"
            || line.starts_with("Kind:")
            || line.starts_with("Language:")
            || line.chars().all(|c| c.is_ascii_digit())
            || line.contains("-->")
            || time_prefix.is_match(line)
            || vtt_time_prefix.is_match(line)
        {
            continue;
        }
        let clean = tag.replace_all(line, "").trim().to_string();
        if !clean.is_empty() {
            parts.push(clean);
        }
    }
    parts.join(" ")
}
