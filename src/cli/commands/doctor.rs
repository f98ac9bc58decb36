//! The `doctor` command: diagnose the local setup.

use super::sources_path;
use crate::cli::{preflight, Output};
use crate::config::{load_sources, Settings};
use crate::error::Result;
use crate::transcribe::is_api_key_configured;

pub fn run_doctor(settings: &Settings) -> Result<()> {
    Output::header("Configuration");
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Output::kv("config", &config_path.display().to_string());
    } else {
        Output::kv("config", "not found (defaults in effect, run `init`)");
    }
    Output::kv("output", &settings.output_dir().display().to_string());
    Output::kv("temp", &settings.temp_dir().display().to_string());

    Output::header("Sources");
    let path = sources_path(None, settings);
    match load_sources(&path) {
        Ok(sources) => {
            Output::kv("file", &path.display().to_string());
            Output::kv("count", &sources.len().to_string());
        }
        Err(e) => Output::error(&format!("{}: {}", path.display(), e)),
    }

    Output::header("Tools");
    match preflight::check_tool("yt-dlp") {
        Ok(()) => Output::success("yt-dlp is available"),
        Err(e) => Output::error(&format!("yt-dlp: {}", e)),
    }

    Output::header("Transcription");
    if is_api_key_configured() {
        Output::success("OPENAI_API_KEY is set, speech-to-text tier enabled");
    } else {
        Output::warning("OPENAI_API_KEY is not set, speech-to-text tier disabled");
    }

    Ok(())
}
