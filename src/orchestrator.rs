//! Pipeline orchestration.
//!
//! Iterates sources, then items per source, threading enumerator → metadata
//! filter → content resolver → output sink. Failures are isolated per item
//! and per source; only configuration errors abort a run. Scheduling is
//! sequential by design: one source at a time, one item at a time, in the
//! enumerator's order, so each sink file has exactly one writer and pacing
//! guarantees hold.

use crate::config::{FetchSettings, Settings, Source};
use crate::enumerate::ItemEnumerator;
use crate::error::Result;
use crate::filter::{FilterDecision, MetadataFilter};
use crate::pacing::{BackoffPolicy, Pacer, Sleeper, TokioSleeper};
use crate::resolve::{
    AudioFetcher, CaptionFetcher, ContentResolver, Resolution, TimedTextClient, TranscriptLookup,
};
use crate::runner::{ProcessRunner, ToolRunner};
use crate::sink::{OutputRecord, OutputSink};
use crate::transcribe::{is_api_key_configured, TranscriptionEngine, WhisperEngine};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Terminal state of one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOutcome {
    /// All items processed, regardless of individual outcomes.
    Done,
    /// Both enumeration strategies failed; the run continued without it.
    FailedToEnumerate,
    /// An external interrupt stopped the run mid-source.
    Cancelled,
}

/// Per-source outcome counts.
#[derive(Debug)]
pub struct SourceSummary {
    pub source_id: String,
    pub outcome: SourceOutcome,
    pub resolved: usize,
    pub skipped: usize,
    pub already_present: usize,
    pub unresolved: usize,
}

impl SourceSummary {
    fn new(source_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            outcome: SourceOutcome::Done,
            resolved: 0,
            skipped: 0,
            already_present: 0,
            unresolved: 0,
        }
    }
}

/// Whole-run outcome summary.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub sources: Vec<SourceSummary>,
}

impl RunSummary {
    pub fn total_resolved(&self) -> usize {
        self.sources.iter().map(|s| s.resolved).sum()
    }

    pub fn total_skipped(&self) -> usize {
        self.sources.iter().map(|s| s.skipped).sum()
    }

    pub fn total_unresolved(&self) -> usize {
        self.sources.iter().map(|s| s.unresolved).sum()
    }

    pub fn failed_sources(&self) -> usize {
        self.sources
            .iter()
            .filter(|s| s.outcome == SourceOutcome::FailedToEnumerate)
            .count()
    }
}

/// The main pipeline orchestrator.
pub struct Orchestrator {
    sources: Vec<Source>,
    enumerator: ItemEnumerator,
    filter: MetadataFilter,
    resolver: ContentResolver,
    sink: OutputSink,
    sleeper: Arc<dyn Sleeper>,
    item_limit: usize,
    cancel: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Create an orchestrator from settings and a validated source list.
    pub fn new(settings: &Settings, sources: Vec<Source>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.fetch.http_timeout_seconds))
            .build()?;

        let engine: Option<Arc<dyn TranscriptionEngine>> = if sources
            .iter()
            .any(|s| s.enable_transcription_engine)
        {
            if is_api_key_configured() {
                Some(Arc::new(WhisperEngine::new(
                    &settings.transcription.model,
                    Duration::from_secs(settings.transcription.timeout_seconds),
                )))
            } else {
                warn!("No API key configured; the speech-to-text tier is disabled for this run");
                None
            }
        } else {
            None
        };

        Self::assemble(
            sources,
            Arc::new(ToolRunner),
            http.clone(),
            Arc::new(TimedTextClient::new(http)),
            engine,
            Arc::new(TokioSleeper),
            settings.retry.policy(),
            &settings.fetch,
            &settings.output_dir(),
            &settings.temp_dir(),
            settings.fetch.item_limit,
        )
    }

    /// Create an orchestrator with custom components (used by tests).
    #[allow(clippy::too_many_arguments)]
    pub fn with_components(
        sources: Vec<Source>,
        runner: Arc<dyn ProcessRunner>,
        transcripts: Arc<dyn TranscriptLookup>,
        engine: Option<Arc<dyn TranscriptionEngine>>,
        sleeper: Arc<dyn Sleeper>,
        policy: BackoffPolicy,
        output_dir: &Path,
        temp_dir: &Path,
        item_limit: usize,
    ) -> Result<Self> {
        Self::assemble(
            sources,
            runner,
            reqwest::Client::new(),
            transcripts,
            engine,
            sleeper,
            policy,
            &FetchSettings::default(),
            output_dir,
            temp_dir,
            item_limit,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        sources: Vec<Source>,
        runner: Arc<dyn ProcessRunner>,
        http: reqwest::Client,
        transcripts: Arc<dyn TranscriptLookup>,
        engine: Option<Arc<dyn TranscriptionEngine>>,
        sleeper: Arc<dyn Sleeper>,
        policy: BackoffPolicy,
        fetch: &FetchSettings,
        output_dir: &Path,
        temp_dir: &Path,
        item_limit: usize,
    ) -> Result<Self> {
        std::fs::create_dir_all(temp_dir)?;

        let enumerator = ItemEnumerator::new(
            runner.clone(),
            http,
            Duration::from_secs(fetch.list_timeout_seconds),
        );
        let filter = MetadataFilter::new(
            runner.clone(),
            Duration::from_secs(fetch.metadata_timeout_seconds),
        );
        let resolver = ContentResolver::new(
            transcripts,
            CaptionFetcher::new(
                runner.clone(),
                Duration::from_secs(fetch.caption_timeout_seconds),
                temp_dir,
            ),
            AudioFetcher::new(runner, Duration::from_secs(fetch.audio_timeout_seconds)),
            engine,
            policy,
            sleeper.clone(),
            temp_dir,
        );
        let sink = OutputSink::open(output_dir)?;

        Ok(Self {
            sources,
            enumerator,
            filter,
            resolver,
            sink,
            sleeper,
            item_limit,
            cancel: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Flag checked between items; setting it stops the run at the next
    /// item boundary, never mid-write.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Process every source, returning the per-source outcome summary.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let sources = self.sources.clone();

        for source in &sources {
            let outcome = self.process_source(source, &mut summary).await?;
            if outcome == SourceOutcome::Cancelled {
                info!("Run cancelled");
                break;
            }
        }

        Ok(summary)
    }

    #[instrument(skip_all, fields(source = %source.id))]
    async fn process_source(
        &mut self,
        source: &Source,
        summary: &mut RunSummary,
    ) -> Result<SourceOutcome> {
        info!(kind = %source.kind, "Starting source");
        let mut stats = SourceSummary::new(&source.id);
        let pacer = Pacer::new(source.pace_delay(), self.sleeper.clone());

        let items = match self.enumerator.enumerate(source, self.item_limit).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Source failed to enumerate, continuing with remaining sources");
                stats.outcome = SourceOutcome::FailedToEnumerate;
                summary.sources.push(stats);
                return Ok(SourceOutcome::FailedToEnumerate);
            }
        };

        info!(count = items.len(), "Enumerated candidate items");

        for mut item in items {
            if self.cancel.load(Ordering::SeqCst) {
                stats.outcome = SourceOutcome::Cancelled;
                summary.sources.push(stats);
                return Ok(SourceOutcome::Cancelled);
            }

            // Resume: skip anything already flushed, with no external
            // requests and therefore no pacing.
            if self.sink.already_has(&source.id, &item.item_id) {
                stats.already_present += 1;
                continue;
            }

            match self.filter.evaluate(source, &item.item_id).await {
                FilterDecision::Skip(reason) => {
                    info!(item = %item.item_id, "Skipped: {}", reason);
                    stats.skipped += 1;
                }
                FilterDecision::Include(metadata) => {
                    item.metadata = metadata;
                    match self.resolver.resolve(source, &item.item_id).await {
                        Resolution::Resolved(result) => {
                            let record = OutputRecord::from_result(&source.id, result);
                            self.sink.append(&record)?;
                            stats.resolved += 1;
                        }
                        Resolution::Unresolved => stats.unresolved += 1,
                    }
                }
            }

            pacer.pause().await;
        }

        info!(
            resolved = stats.resolved,
            skipped = stats.skipped,
            unresolved = stats.unresolved,
            already_present = stats.already_present,
            "Source done"
        );
        summary.sources.push(stats);
        Ok(SourceOutcome::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;
    use crate::pacing::testing::RecordingSleeper;
    use crate::resolve::testing::MockLookup;
    use crate::runner::testing::{MockRunner, Scripted};
    use tempfile::TempDir;

    fn source(id: &str, pace: f64) -> Source {
        Source {
            id: id.to_string(),
            kind: SourceKind::Channel,
            endpoint: format!("https://www.youtube.com/@{}/videos", id),
            languages: vec!["pl".to_string(), "en".to_string()],
            pace_delay_seconds: pace,
            max_duration_minutes: Some(30),
            published_after: None,
            enable_auto_captions: false,
            enable_transcription_engine: false,
        }
    }

    struct Fixture {
        orchestrator: Orchestrator,
        lookup: Arc<MockLookup>,
        sleeper: Arc<RecordingSleeper>,
        output_dir: TempDir,
        _temp_dir: TempDir,
    }

    fn fixture_in(
        output_dir: TempDir,
        sources: Vec<Source>,
        script: Vec<Scripted>,
        lookup: MockLookup,
    ) -> Fixture {
        let temp_dir = tempfile::tempdir().unwrap();
        let lookup = Arc::new(lookup);
        let sleeper = Arc::new(RecordingSleeper::default());

        let orchestrator = Orchestrator::with_components(
            sources,
            Arc::new(MockRunner::new(script)),
            lookup.clone(),
            None,
            sleeper.clone(),
            BackoffPolicy::default(),
            output_dir.path(),
            temp_dir.path(),
            5,
        )
        .unwrap();

        Fixture {
            orchestrator,
            lookup,
            sleeper,
            output_dir,
            _temp_dir: temp_dir,
        }
    }

    fn fixture(sources: Vec<Source>, script: Vec<Scripted>, lookup: MockLookup) -> Fixture {
        fixture_in(tempfile::tempdir().unwrap(), sources, script, lookup)
    }

    /// Script for enumerating two fixed items: the uploads-playlist probe
    /// fails, the direct listing answers.
    fn enumeration_script() -> Vec<Scripted> {
        vec![
            Scripted::fails(1, "no channel metadata"),
            Scripted::ok("AAAAAAAAAAA\nBBBBBBBBBBB\n"),
        ]
    }

    fn metadata_ok() -> Scripted {
        Scripted::ok(r#"{"duration": 600.0, "upload_date": "20250201"}"#)
    }

    #[tokio::test]
    async fn test_run_resolves_and_counts() {
        let mut script = enumeration_script();
        script.push(metadata_ok()); // item A
        script.push(metadata_ok()); // item B
        let lookup = MockLookup::default().with_manual("pl", Ok(Some("tekst".to_string())));

        let mut f = fixture(vec![source("wei", 2.0)], script, lookup);
        let summary = f.orchestrator.run().await.unwrap();

        assert_eq!(summary.sources.len(), 1);
        let s = &summary.sources[0];
        assert_eq!(s.outcome, SourceOutcome::Done);
        assert_eq!(s.resolved, 1);
        assert_eq!(s.unresolved, 1);
        assert_eq!(s.skipped, 0);

        // Fixed pacing after each fully processed item.
        assert_eq!(
            *f.sleeper.slept.lock().unwrap(),
            vec![Duration::from_secs(2), Duration::from_secs(2)]
        );

        let content =
            std::fs::read_to_string(f.output_dir.path().join("wei.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("\"itemId\":\"AAAAAAAAAAA\""));
    }

    #[tokio::test]
    async fn test_metadata_gate_blocks_resolver() {
        let mut script = enumeration_script();
        // Item A exceeds the 30 minute cutoff, item B is too old.
        script.push(Scripted::ok(r#"{"duration": 2700.0}"#));
        script.push(Scripted::ok(r#"{"duration": 600.0, "upload_date": "20200101"}"#));

        let mut sources = vec![source("wei", 0.0)];
        sources[0].published_after = chrono::NaiveDate::from_ymd_opt(2024, 1, 1);

        let mut f = fixture(sources, script, MockLookup::default());
        let summary = f.orchestrator.run().await.unwrap();

        assert_eq!(summary.sources[0].skipped, 2);
        assert_eq!(summary.sources[0].resolved, 0);
        // The resolver was never consulted.
        assert_eq!(f.lookup.manual_calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let mut script = enumeration_script();
        script.push(metadata_ok());
        script.push(metadata_ok());
        let lookup = MockLookup::default()
            .with_manual("pl", Ok(Some("tekst a".to_string())))
            .with_generated("pl", Ok(Some("tekst b".to_string())));

        let mut f = fixture(vec![source("wei", 0.0)], script, lookup);
        let first = f.orchestrator.run().await.unwrap();
        assert_eq!(first.total_resolved(), 2);

        // Second run over the same output directory: both items are found
        // in the log before any metadata or resolution work happens.
        let mut f2 = fixture_in(
            f.output_dir,
            vec![source("wei", 0.0)],
            enumeration_script(),
            MockLookup::default(),
        );
        let second = f2.orchestrator.run().await.unwrap();

        assert_eq!(second.total_resolved(), 0);
        assert_eq!(second.sources[0].already_present, 2);

        let content =
            std::fs::read_to_string(f2.output_dir.path().join("wei.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_enumeration_failure_does_not_stop_the_run() {
        let mut script = vec![
            // First source: every strategy fails.
            Scripted::fails(1, "nope"),
            Scripted::fails(1, "nope"),
            Scripted::fails(1, "nope"),
            // Second source enumerates one item.
            Scripted::fails(1, "no channel metadata"),
            Scripted::ok("CCCCCCCCCCC\n"),
        ];
        script.push(metadata_ok());
        let lookup = MockLookup::default().with_manual("pl", Ok(Some("ok".to_string())));

        let mut f = fixture(vec![source("broken", 0.0), source("works", 0.0)], script, lookup);
        let summary = f.orchestrator.run().await.unwrap();

        assert_eq!(summary.sources.len(), 2);
        assert_eq!(summary.sources[0].outcome, SourceOutcome::FailedToEnumerate);
        assert_eq!(summary.sources[1].outcome, SourceOutcome::Done);
        assert_eq!(summary.failed_sources(), 1);
        assert_eq!(summary.total_resolved(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_between_items() {
        let mut script = enumeration_script();
        script.push(metadata_ok());
        let lookup = MockLookup::default().with_manual("pl", Ok(Some("tekst".to_string())));

        let mut f = fixture(vec![source("wei", 0.0)], script, lookup);
        // Cancel before the run: the flag is checked at the first item
        // boundary, so nothing is processed.
        f.orchestrator.cancel_flag().store(true, Ordering::SeqCst);
        let summary = f.orchestrator.run().await.unwrap();

        assert_eq!(summary.sources[0].outcome, SourceOutcome::Cancelled);
        assert_eq!(summary.total_resolved(), 0);
    }
}
