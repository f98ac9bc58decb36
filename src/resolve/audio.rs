//! Audio download for the speech-to-text tier.

use crate::error::{classify_tool_failure, Result, SkrybaError};
use crate::runner::ProcessRunner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct AudioFetcher {
    runner: Arc<dyn ProcessRunner>,
    timeout: Duration,
}

impl AudioFetcher {
    pub fn new(runner: Arc<dyn ProcessRunner>, timeout: Duration) -> Self {
        Self { runner, timeout }
    }

    /// Download the best audio track for an item into `dir`.
    ///
    /// Failures are classified: explicit forbidden/unavailable/private
    /// signals are terminal, everything else transient (the caller retries
    /// with backoff).
    pub async fn fetch(&self, item_id: &str, dir: &Path) -> Result<PathBuf> {
        let template = dir.join(format!("{}.%(ext)s", item_id));
        let url = format!("https://www.youtube.com/watch?v={}", item_id);

        info!(item = item_id, "Downloading audio");

        let args = vec![
            "-f".to_string(),
            "bestaudio".to_string(),
            "-o".to_string(),
            template.to_string_lossy().into_owned(),
            url,
        ];

        let output = self.runner.run("yt-dlp", &args, self.timeout).await?;
        if !output.success() {
            return Err(classify_tool_failure("audio download", &output.stderr));
        }

        find_audio_file(dir, item_id).ok_or_else(|| {
            SkrybaError::Transient("Download reported success but produced no audio file".into())
        })
    }
}

/// Locate a downloaded audio file by item id across the formats the
/// downloader may produce.
fn find_audio_file(dir: &Path, item_id: &str) -> Option<PathBuf> {
    for ext in ["mp3", "m4a", "webm", "opus", "mp4", "ogg"] {
        let candidate = dir.join(format!("{}.{}", item_id, ext));
        if candidate.exists() {
            return Some(candidate);
        }
    }

    // Fallback: scan for a matching prefix.
    std::fs::read_dir(dir).ok()?.flatten().find_map(|entry| {
        let name = entry.file_name();
        name.to_string_lossy()
            .starts_with(item_id)
            .then(|| entry.path())
    })
}
