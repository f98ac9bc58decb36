//! The `sources` command: list configured sources.

use super::sources_path;
use crate::cli::Output;
use crate::config::{load_sources, Settings};
use crate::error::Result;

pub fn run_sources(sources_override: Option<&str>, settings: &Settings) -> Result<()> {
    let path = sources_path(sources_override, settings);
    let sources = load_sources(&path)?;

    Output::header(&format!("Sources ({})", sources.len()));
    for source in &sources {
        Output::list_item(&format!("{} [{}]", source.id, source.kind));
        Output::kv("endpoint", &source.endpoint);
        Output::kv("languages", &source.languages.join(", "));
        if let Some(max) = source.max_duration_minutes {
            Output::kv("max duration", &format!("{} min", max));
        }
        if let Some(after) = source.published_after {
            Output::kv("published after", &after.to_string());
        }
    }

    Ok(())
}
