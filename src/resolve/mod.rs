//! Content resolution: the tiered fallback chain.
//!
//! Given an included candidate item and its source's language priority
//! list, the resolver attempts tiers in strict order and short-circuits on
//! the first success:
//!
//! 1. Manual transcript (human-authored)
//! 2. Auto-generated transcript (same API family, different endpoint)
//! 3. Platform auto-captions (distinct subsystem, if enabled)
//! 4. Audio download + transcription engine (if enabled)
//!
//! Tiers 1-3 iterate the language list in priority order; tier 4 uses only
//! the highest-priority language, since transcription is not queryable per
//! language. Retryable errors are retried within the tier; terminal and
//! parse failures fall through to the next tier without retrying.

mod audio;
mod captions;
mod transcript;

pub use audio::AudioFetcher;
pub use captions::{extract_caption_text, CaptionFetcher};
pub use transcript::{TimedTextClient, TranscriptLookup};

use crate::config::Source;
use crate::error::{Result, SkrybaError};
use crate::pacing::{retry, BackoffPolicy, Sleeper};
use crate::transcribe::TranscriptionEngine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One fallback strategy in the resolution chain, in strict priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "manual")]
    Manual,
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "captions")]
    Captions,
    #[serde(rename = "speech-to-text")]
    SpeechToText,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Manual => write!(f, "manual"),
            Tier::Auto => write!(f, "auto"),
            Tier::Captions => write!(f, "captions"),
            Tier::SpeechToText => write!(f, "speech-to-text"),
        }
    }
}

/// The in-memory outcome of successfully resolving one item's text.
#[derive(Debug, Clone)]
pub struct AcquisitionResult {
    pub item_id: String,
    /// Non-empty on success.
    pub text: String,
    pub tier: Tier,
    pub language_used: String,
    pub resolved_at: DateTime<Utc>,
}

/// Definitive per-item outcome of the chain.
#[derive(Debug)]
pub enum Resolution {
    Resolved(AcquisitionResult),
    /// All tiers exhausted without text. Counted, not an error.
    Unresolved,
}

pub struct ContentResolver {
    transcripts: Arc<dyn TranscriptLookup>,
    captions: CaptionFetcher,
    audio: AudioFetcher,
    engine: Option<Arc<dyn TranscriptionEngine>>,
    policy: BackoffPolicy,
    sleeper: Arc<dyn Sleeper>,
    temp_dir: PathBuf,
}

impl ContentResolver {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transcripts: Arc<dyn TranscriptLookup>,
        captions: CaptionFetcher,
        audio: AudioFetcher,
        engine: Option<Arc<dyn TranscriptionEngine>>,
        policy: BackoffPolicy,
        sleeper: Arc<dyn Sleeper>,
        temp_dir: &Path,
    ) -> Self {
        Self {
            transcripts,
            captions,
            audio,
            engine,
            policy,
            sleeper,
            temp_dir: temp_dir.to_path_buf(),
        }
    }

    /// Run the fallback chain for one item.
    ///
    /// All tier-level failures are local: they are logged and the chain
    /// falls through. An exhausted chain yields [`Resolution::Unresolved`].
    pub async fn resolve(&self, source: &Source, item_id: &str) -> Resolution {
        for language in &source.languages {
            if let Some(text) = self
                .attempt(item_id, Tier::Manual, language, || {
                    self.transcripts.fetch_manual(item_id, language)
                })
                .await
            {
                return self.resolved(item_id, text, Tier::Manual, language);
            }
        }

        for language in &source.languages {
            if let Some(text) = self
                .attempt(item_id, Tier::Auto, language, || {
                    self.transcripts.fetch_generated(item_id, language)
                })
                .await
            {
                return self.resolved(item_id, text, Tier::Auto, language);
            }
        }

        if source.enable_auto_captions {
            for language in &source.languages {
                if let Some(text) = self
                    .attempt(item_id, Tier::Captions, language, || {
                        self.captions.fetch(item_id, language)
                    })
                    .await
                {
                    return self.resolved(item_id, text, Tier::Captions, language);
                }
            }
        }

        if source.enable_transcription_engine {
            if let Some(engine) = self.engine.clone() {
                let language = source.primary_language();
                match self.speech_to_text(engine.as_ref(), item_id, language).await {
                    Ok(Some(text)) => {
                        return self.resolved(item_id, text, Tier::SpeechToText, language)
                    }
                    Ok(None) => {
                        debug!(item = item_id, "Transcription produced no text")
                    }
                    Err(e) => {
                        warn!(item = item_id, error = %e, "Speech-to-text tier failed")
                    }
                }
            }
        }

        info!(item = item_id, "All tiers exhausted, item unresolved");
        Resolution::Unresolved
    }

    /// Run one tier/language attempt with backoff on transient failures.
    ///
    /// Returns the text on success; any other outcome (no track, terminal
    /// failure, parse failure, retries exhausted) becomes a fallthrough.
    async fn attempt<F, Fut>(
        &self,
        item_id: &str,
        tier: Tier,
        language: &str,
        operation: F,
    ) -> Option<String>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<String>>>,
    {
        match retry(&self.policy, self.sleeper.as_ref(), operation).await {
            Ok(Some(text)) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                debug!(item = item_id, tier = %tier, language, "No text at this tier");
                None
            }
            Err(SkrybaError::Unavailable(msg)) => {
                debug!(item = item_id, tier = %tier, language, "Unavailable: {}", msg);
                None
            }
            Err(SkrybaError::Parse(msg)) => {
                warn!(item = item_id, tier = %tier, language, "Malformed payload: {}", msg);
                None
            }
            Err(e) => {
                warn!(item = item_id, tier = %tier, language, error = %e, "Tier failed");
                None
            }
        }
    }

    /// Tier 4: download audio (with retry) and hand it to the engine.
    async fn speech_to_text(
        &self,
        engine: &dyn TranscriptionEngine,
        item_id: &str,
        language: &str,
    ) -> Result<Option<String>> {
        let workdir = tempfile::tempdir_in(&self.temp_dir)?;

        let audio_path = retry(&self.policy, self.sleeper.as_ref(), || {
            self.audio.fetch(item_id, workdir.path())
        })
        .await?;

        let text = engine.transcribe(&audio_path, language).await?;
        Ok((!text.trim().is_empty()).then(|| text.trim().to_string()))
    }

    fn resolved(&self, item_id: &str, text: String, tier: Tier, language: &str) -> Resolution {
        info!(item = item_id, tier = %tier, language, chars = text.len(), "Resolved");
        Resolution::Resolved(AcquisitionResult {
            item_id: item_id.to_string(),
            text,
            tier,
            language_used: language.to_string(),
            resolved_at: Utc::now(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted [`TranscriptLookup`] double keyed by (language, generated).
    #[derive(Default)]
    pub struct MockLookup {
        manual: Mutex<HashMap<String, Result<Option<String>>>>,
        generated: Mutex<HashMap<String, Result<Option<String>>>>,
        pub manual_calls: AtomicUsize,
        pub generated_calls: AtomicUsize,
    }

    impl MockLookup {
        pub fn with_manual(self, language: &str, result: Result<Option<String>>) -> Self {
            self.manual.lock().unwrap().insert(language.to_string(), result);
            self
        }

        pub fn with_generated(self, language: &str, result: Result<Option<String>>) -> Self {
            self.generated
                .lock()
                .unwrap()
                .insert(language.to_string(), result);
            self
        }

        fn take(map: &Mutex<HashMap<String, Result<Option<String>>>>, language: &str) -> Result<Option<String>> {
            map.lock()
                .unwrap()
                .remove(language)
                .unwrap_or(Ok(None))
        }
    }

    #[async_trait]
    impl TranscriptLookup for MockLookup {
        async fn fetch_manual(&self, _item_id: &str, language: &str) -> Result<Option<String>> {
            self.manual_calls.fetch_add(1, Ordering::SeqCst);
            Self::take(&self.manual, language)
        }

        async fn fetch_generated(&self, _item_id: &str, language: &str) -> Result<Option<String>> {
            self.generated_calls.fetch_add(1, Ordering::SeqCst);
            Self::take(&self.generated, language)
        }
    }

    /// Fixed-output [`TranscriptionEngine`] double.
    pub struct MockEngine {
        pub text: String,
        pub calls: AtomicUsize,
    }

    impl MockEngine {
        pub fn returning(text: &str) -> Self {
            Self {
                text: text.to_string(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TranscriptionEngine for MockEngine {
        async fn transcribe(&self, _audio_path: &Path, _language: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.text.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{MockEngine, MockLookup};
    use super::*;
    use crate::config::SourceKind;
    use crate::pacing::testing::RecordingSleeper;
    use crate::runner::testing::{MockRunner, Scripted};
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tempfile::TempDir;

    fn source() -> Source {
        Source {
            id: "x".to_string(),
            kind: SourceKind::Channel,
            endpoint: "https://www.youtube.com/@x/videos".to_string(),
            languages: vec!["pl".to_string(), "en".to_string()],
            pace_delay_seconds: 0.0,
            max_duration_minutes: None,
            published_after: None,
            enable_auto_captions: true,
            enable_transcription_engine: true,
        }
    }

    struct Fixture {
        resolver: ContentResolver,
        lookup: Arc<MockLookup>,
        engine: Arc<MockEngine>,
        runner: Arc<MockRunner>,
        sleeper: Arc<RecordingSleeper>,
        _tmp: TempDir,
    }

    fn fixture(lookup: MockLookup, runner_script: Vec<Scripted>, engine_text: &str) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let lookup = Arc::new(lookup);
        let runner = Arc::new(MockRunner::new(runner_script));
        let engine = Arc::new(MockEngine::returning(engine_text));
        let sleeper = Arc::new(RecordingSleeper::default());

        let resolver = ContentResolver::new(
            lookup.clone(),
            CaptionFetcher::new(runner.clone(), Duration::from_secs(60), tmp.path()),
            AudioFetcher::new(runner.clone(), Duration::from_secs(120)),
            Some(engine.clone()),
            BackoffPolicy::default(),
            sleeper.clone(),
            tmp.path(),
        );

        Fixture {
            resolver,
            lookup,
            engine,
            runner,
            sleeper,
            _tmp: tmp,
        }
    }

    #[tokio::test]
    async fn test_manual_transcript_short_circuits() {
        let lookup = MockLookup::default().with_manual("pl", Ok(Some("czesc".to_string())));
        let f = fixture(lookup, vec![], "");

        match f.resolver.resolve(&source(), "AAAAAAAAAAA").await {
            Resolution::Resolved(result) => {
                assert_eq!(result.tier, Tier::Manual);
                assert_eq!(result.language_used, "pl");
                assert_eq!(result.text, "czesc");
            }
            Resolution::Unresolved => panic!("expected resolution"),
        }

        // Later tiers never ran.
        assert_eq!(f.lookup.generated_calls.load(Ordering::SeqCst), 0);
        assert_eq!(f.runner.call_count(), 0);
        assert_eq!(f.engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_language_priority_within_tier() {
        let lookup = MockLookup::default()
            .with_manual("pl", Ok(None))
            .with_manual("en", Ok(Some("hello".to_string())));
        let f = fixture(lookup, vec![], "");

        match f.resolver.resolve(&source(), "AAAAAAAAAAA").await {
            Resolution::Resolved(result) => {
                assert_eq!(result.tier, Tier::Manual);
                assert_eq!(result.language_used, "en");
            }
            Resolution::Unresolved => panic!("expected resolution"),
        }
        assert_eq!(f.lookup.manual_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_falls_through_to_captions() {
        let lookup = MockLookup::default();
        // First caption language yields a track.
        let f = fixture(
            lookup,
            vec![Scripted::ok("").with_file("AAAAAAAAAAA.pl.vtt")],
            "",
        );

        match f.resolver.resolve(&source(), "AAAAAAAAAAA").await {
            Resolution::Resolved(result) => {
                assert_eq!(result.tier, Tier::Captions);
                assert_eq!(result.language_used, "pl");
                assert_eq!(result.text, "stub");
            }
            Resolution::Unresolved => panic!("expected resolution"),
        }
        assert_eq!(f.engine.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_captions_disabled_skips_to_engine() {
        let mut src = source();
        src.enable_auto_captions = false;

        // Single audio download, then the engine answers.
        let f = fixture(
            MockLookup::default(),
            vec![Scripted::ok("").with_file("AAAAAAAAAAA.m4a")],
            "transcribed text",
        );

        match f.resolver.resolve(&src, "AAAAAAAAAAA").await {
            Resolution::Resolved(result) => {
                assert_eq!(result.tier, Tier::SpeechToText);
                // Only the highest-priority language is used.
                assert_eq!(result.language_used, "pl");
            }
            Resolution::Unresolved => panic!("expected resolution"),
        }
        assert_eq!(f.runner.call_count(), 1);
    }

    #[tokio::test]
    async fn test_audio_download_retries_then_succeeds() {
        let mut src = source();
        src.enable_auto_captions = false;

        let f = fixture(
            MockLookup::default(),
            vec![
                Scripted::fails(1, "HTTP Error 429: Too Many Requests"),
                Scripted::err(SkrybaError::Transient("timed out".into())),
                Scripted::ok("").with_file("AAAAAAAAAAA.webm"),
            ],
            "slowo w slowo",
        );

        match f.resolver.resolve(&src, "AAAAAAAAAAA").await {
            Resolution::Resolved(result) => assert_eq!(result.tier, Tier::SpeechToText),
            Resolution::Unresolved => panic!("expected resolution"),
        }

        assert_eq!(f.runner.call_count(), 3);
        assert_eq!(
            *f.sleeper.slept.lock().unwrap(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }

    #[tokio::test]
    async fn test_terminal_failure_is_not_retried_and_falls_through() {
        let lookup = MockLookup::default()
            .with_manual("pl", Err(SkrybaError::Unavailable("forbidden".into())))
            .with_generated("pl", Ok(Some("auto text".to_string())));
        let f = fixture(lookup, vec![], "");

        match f.resolver.resolve(&source(), "AAAAAAAAAAA").await {
            Resolution::Resolved(result) => assert_eq!(result.tier, Tier::Auto),
            Resolution::Unresolved => panic!("expected resolution"),
        }

        // pl failed terminally (1 attempt), en was still consulted.
        assert_eq!(f.lookup.manual_calls.load(Ordering::SeqCst), 2);
        assert!(f.sleeper.slept.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_unresolved() {
        let mut src = source();
        src.enable_auto_captions = false;
        src.enable_transcription_engine = false;

        let f = fixture(MockLookup::default(), vec![], "");
        assert!(matches!(
            f.resolver.resolve(&src, "AAAAAAAAAAA").await,
            Resolution::Unresolved
        ));
        assert_eq!(f.runner.call_count(), 0);
    }

    #[test]
    fn test_tier_serialization() {
        assert_eq!(serde_json::to_string(&Tier::Manual).unwrap(), "\"manual\"");
        assert_eq!(
            serde_json::to_string(&Tier::SpeechToText).unwrap(),
            "\"speech-to-text\""
        );
        assert_eq!(Tier::Captions.to_string(), "captions");
    }
}
