//! Structured transcript lookup (resolution tiers 1 and 2).
//!
//! Both tiers query the same API family: tier 1 asks for human-authored
//! transcripts, tier 2 for platform-generated (ASR) ones, via a different
//! endpoint parameter.

use crate::error::{Result, SkrybaError};
use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

/// Capability for fetching structured transcripts.
#[async_trait]
pub trait TranscriptLookup: Send + Sync {
    /// Human-authored transcript in the given language, if one exists.
    async fn fetch_manual(&self, item_id: &str, language: &str) -> Result<Option<String>>;

    /// Platform-generated transcript in the given language, if one exists.
    async fn fetch_generated(&self, item_id: &str, language: &str) -> Result<Option<String>>;
}

/// Production lookup against the platform timedtext endpoint.
pub struct TimedTextClient {
    http: reqwest::Client,
    text_regex: Regex,
}

impl TimedTextClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            text_regex: Regex::new(r"<text[^>]*>([^<]*)</text>").expect("Invalid regex"),
        }
    }

    async fn query(&self, item_id: &str, language: &str, generated: bool) -> Result<Option<String>> {
        let mut url = format!(
            "https://www.youtube.com/api/timedtext?v={}&lang={}",
            item_id, language
        );
        if generated {
            url.push_str("&kind=asr");
        }

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(SkrybaError::Unavailable(format!(
                "Transcript access forbidden for {}",
                item_id
            )));
        }
        if !status.is_success() {
            return Err(SkrybaError::Transient(format!(
                "Transcript endpoint returned HTTP {}",
                status
            )));
        }

        let body = response.text().await?;
        // An absent track comes back as an empty 200 response.
        if body.trim().is_empty() {
            return Ok(None);
        }

        let text = self.extract_text(&body)?;
        if text.is_empty() {
            debug!(item = item_id, language, "Transcript track exists but is empty");
            Ok(None)
        } else {
            Ok(Some(text))
        }
    }

    /// Pull the cue texts out of a timedtext payload and join them.
    fn extract_text(&self, body: &str) -> Result<String> {
        if !body.contains("<transcript") && !body.contains("<text") {
            return Err(SkrybaError::Parse(
                "Transcript payload is not timedtext XML".to_string(),
            ));
        }

        let parts: Vec<String> = self
            .text_regex
            .captures_iter(body)
            .map(|caps| unescape(&caps[1]))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(parts.join(" "))
    }
}

/// Decode the XML entities the timedtext endpoint emits.
fn unescape(text: &str) -> String {
    text.replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[async_trait]
impl TranscriptLookup for TimedTextClient {
    async fn fetch_manual(&self, item_id: &str, language: &str) -> Result<Option<String>> {
        self.query(item_id, language, false).await
    }

    async fn fetch_generated(&self, item_id: &str, language: &str) -> Result<Option<String>> {
        self.query(item_id, language, true).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> TimedTextClient {
        TimedTextClient::new(reqwest::Client::new())
    }

    #[test]
    fn test_extract_text_joins_cues() {
        let body = r#"<?xml version="1.0"?>
<transcript>
  <text start="0.0" dur="2.1">Dzie&#39;n dobry</text>
  <text start="2.1" dur="1.4">  </text>
  <text start="3.5" dur="2.0">pa&amp;nstwu</text>
</transcript>"#;
        assert_eq!(
            client().extract_text(body).unwrap(),
            "Dzie'n dobry pa&nstwu"
        );
    }

    #[test]
    fn test_extract_text_empty_transcript() {
        assert_eq!(client().extract_text("<transcript></transcript>").unwrap(), "");
    }

    #[test]
    fn test_extract_text_rejects_non_xml() {
        let err = client().extract_text("<html>error page</html>").unwrap_err();
        assert!(matches!(err, SkrybaError::Parse(_)));
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("a &lt;b&gt; &quot;c&quot; &amp;d"), "a <b> \"c\" &d");
    }
}
