//! Audio transcription capability.
//!
//! The transcription engine is the last resort of the resolution chain and
//! is injected as a capability so that the pipeline works (minus that tier)
//! when no engine is configured, and so tests can substitute a double.

mod whisper;

pub use whisper::{is_api_key_configured, WhisperEngine};

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Converts an audio file to text.
#[async_trait]
pub trait TranscriptionEngine: Send + Sync {
    /// Transcribe the audio file, hinting the expected language.
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<String>;
}
