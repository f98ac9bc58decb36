//! OpenAI Whisper transcription engine.

use super::TranscriptionEngine;
use crate::error::{Result, SkrybaError};
use async_openai::config::OpenAIConfig;
use async_openai::types::{AudioInput, CreateTranscriptionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

/// Whisper-based transcription engine.
pub struct WhisperEngine {
    client: Client<OpenAIConfig>,
    model: String,
}

impl WhisperEngine {
    /// Create an engine with a bounded request timeout, preventing hung
    /// API calls from stalling the pipeline.
    pub fn new(model: &str, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        let client = Client::with_config(OpenAIConfig::default()).with_http_client(http_client);

        Self {
            client,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TranscriptionEngine for WhisperEngine {
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe(&self, audio_path: &Path, language: &str) -> Result<String> {
        debug!("Transcribing audio file with {}", self.model);

        let file_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(file_name, file_bytes))
            .model(&self.model)
            .language(language)
            .build()
            .map_err(|e| SkrybaError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| SkrybaError::OpenAI(format!("Whisper API error: {}", e)))?;

        Ok(response.text.trim().to_string())
    }
}

/// Whether the OpenAI API key is present in the environment.
pub fn is_api_key_configured() -> bool {
    std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_check() {
        // This just tests that the function works
        let _ = is_api_key_configured();
    }
}
