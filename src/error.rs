//! Error types for Skryba.

use thiserror::Error;

/// Library-level error type for Skryba operations.
#[derive(Error, Debug)]
pub enum SkrybaError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// A network or tool failure that is worth retrying (timeout, generic
    /// non-zero exit).
    #[error("Transient failure: {0}")]
    Transient(String),

    /// An explicit forbidden/unavailable/private signal from an external
    /// tool. Never retried.
    #[error("Permanently unavailable: {0}")]
    Unavailable(String),

    /// Malformed caption or metadata payload. Not retried; the affected
    /// tier simply yields no text.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Both primary and fallback enumeration strategies failed for a source.
    #[error("Enumeration failed: {0}")]
    Enumeration(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Sink error: {0}")]
    Sink(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl SkrybaError {
    /// Whether the failure is transient and the operation should be retried.
    ///
    /// Terminal classifications (`Unavailable`, `Parse`, configuration and
    /// tool-missing errors) must be attempted exactly once.
    pub fn is_transient(&self) -> bool {
        match self {
            SkrybaError::Transient(_) => true,
            SkrybaError::Http(e) => e.is_timeout() || e.is_connect(),
            SkrybaError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }
}

/// Classify a failed external tool invocation from its stderr.
///
/// Explicit forbidden/unavailable/private signals are terminal; anything
/// else (rate limiting, flaky network, extractor hiccups) is transient.
pub fn classify_tool_failure(context: &str, stderr: &str) -> SkrybaError {
    let lower = stderr.to_lowercase();
    if lower.contains("403")
        || lower.contains("forbidden")
        || lower.contains("unavailable")
        || lower.contains("private")
    {
        SkrybaError::Unavailable(format!("{}: {}", context, stderr.trim()))
    } else {
        SkrybaError::Transient(format!("{}: {}", context, stderr.trim()))
    }
}

/// Result type alias for Skryba operations.
pub type Result<T> = std::result::Result<T, SkrybaError>;
