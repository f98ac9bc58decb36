//! Configuration management for Skryba.

mod settings;
mod sources;

pub use settings::{
    FetchSettings, GeneralSettings, RetrySettings, Settings, TranscriptionSettings,
};
pub use sources::{load_sources, Source, SourceKind};
