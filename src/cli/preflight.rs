//! Pre-flight checks before expensive operations.
//!
//! Validates that required external tools are available before starting a
//! run that would otherwise fail midway.

use crate::error::{Result, SkrybaError};
use std::process::Command;

/// Check requirements for a pipeline run.
///
/// The downloader tool is required; a missing API key is not fatal here
/// because the speech-to-text tier degrades gracefully.
pub fn check_run() -> Result<()> {
    check_tool("yt-dlp")
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(SkrybaError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(SkrybaError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(SkrybaError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
