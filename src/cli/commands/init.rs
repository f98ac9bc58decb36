//! The `init` command: write default configuration and a sources skeleton.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::Result;

const SOURCES_SKELETON: &str = r#"# Skryba source list.
#
# Each source is enumerated most-recent-first and its items resolved into
# per-source JSONL logs under the data directory.

# [[sources]]
# id = "example-channel"
# kind = "channel"                 # "channel" or "feed"
# endpoint = "https://www.youtube.com/@example/videos"
# languages = ["pl", "en"]         # priority order, first entry is used for speech-to-text
# pace_delay_seconds = 1.5
# max_duration_minutes = 30        # optional
# published_after = "2024-01-01"   # optional
# enable_auto_captions = true
# enable_transcription_engine = true
"#;

pub fn run_init(settings: &Settings) -> Result<()> {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        Output::info(&format!(
            "Configuration already exists at {}",
            config_path.display()
        ));
    } else {
        settings.save()?;
        Output::success(&format!("Wrote configuration to {}", config_path.display()));
    }

    let sources_path = settings.sources_file();
    if sources_path.exists() {
        Output::info(&format!(
            "Source list already exists at {}",
            sources_path.display()
        ));
    } else {
        if let Some(parent) = sources_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&sources_path, SOURCES_SKELETON)?;
        Output::success(&format!(
            "Wrote source list skeleton to {}",
            sources_path.display()
        ));
    }

    std::fs::create_dir_all(settings.output_dir())?;
    std::fs::create_dir_all(settings.temp_dir())?;
    Output::kv("output", &settings.output_dir().display().to_string());
    Output::kv("temp", &settings.temp_dir().display().to_string());

    Ok(())
}
