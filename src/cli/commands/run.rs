//! The `run` command: execute the acquisition pipeline.

use super::load_selected;
use crate::cli::{preflight, Output};
use crate::config::Settings;
use crate::error::{Result, SkrybaError};
use crate::orchestrator::{Orchestrator, SourceOutcome};
use std::sync::atomic::Ordering;

pub async fn run_pipeline(
    sources_override: Option<&str>,
    selected: Option<&str>,
    limit: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    if let Some(limit) = limit {
        settings.fetch.item_limit = limit;
    }
    if settings.fetch.item_limit == 0 {
        return Err(SkrybaError::Config(
            "Item limit must be at least 1".to_string(),
        ));
    }

    preflight::check_run()?;

    let sources = load_selected(sources_override, selected, &settings)?;
    Output::info(&format!(
        "Processing {} source(s), up to {} item(s) each",
        sources.len(),
        settings.fetch.item_limit
    ));

    let mut orchestrator = Orchestrator::new(&settings, sources)?;

    // Stop at the next item boundary on ctrl-c; never mid-write.
    let cancel = orchestrator.cancel_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!();
            Output::warning("Interrupt received, finishing the current item...");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    let spinner = Output::spinner("Acquiring transcripts...");
    let summary = orchestrator.run().await?;
    spinner.finish_and_clear();

    Output::header("Run summary");
    for source in &summary.sources {
        match source.outcome {
            SourceOutcome::FailedToEnumerate => {
                Output::kv(&source.source_id, "failed to enumerate")
            }
            outcome => Output::kv(
                &source.source_id,
                &format!(
                    "{} resolved, {} skipped, {} unresolved, {} already present{}",
                    source.resolved,
                    source.skipped,
                    source.unresolved,
                    source.already_present,
                    if outcome == SourceOutcome::Cancelled {
                        " (cancelled)"
                    } else {
                        ""
                    }
                ),
            ),
        }
    }

    Output::success(&format!(
        "{} resolved, {} skipped, {} unresolved, {} source(s) failed to enumerate",
        summary.total_resolved(),
        summary.total_skipped(),
        summary.total_unresolved(),
        summary.failed_sources()
    ));
    Output::kv("output", &settings.output_dir().display().to_string());

    Ok(())
}
