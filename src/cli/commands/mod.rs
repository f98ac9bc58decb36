//! CLI command implementations.

mod doctor;
mod init;
mod run;
mod sources;

pub use doctor::run_doctor;
pub use init::run_init;
pub use run::run_pipeline;
pub use sources::run_sources;

use crate::config::{load_sources, Settings, Source};
use crate::error::Result;
use std::path::PathBuf;

/// Resolve the source list path from a CLI override or the settings.
fn sources_path(override_path: Option<&str>, settings: &Settings) -> PathBuf {
    match override_path {
        Some(p) => Settings::expand_path(p),
        None => settings.sources_file(),
    }
}

/// Load sources, optionally narrowed to ids containing `selected`.
fn load_selected(
    override_path: Option<&str>,
    selected: Option<&str>,
    settings: &Settings,
) -> Result<Vec<Source>> {
    let path = sources_path(override_path, settings);
    let mut sources = load_sources(&path)?;

    if let Some(needle) = selected {
        let needle = needle.to_lowercase();
        sources.retain(|s| s.id.to_lowercase().contains(&needle));
        if sources.is_empty() {
            return Err(crate::error::SkrybaError::Config(format!(
                "No source id matches {:?}",
                needle
            )));
        }
    }

    Ok(sources)
}
