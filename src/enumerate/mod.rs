//! Item enumeration.
//!
//! Resolves a [`Source`](crate::config::Source) into an ordered list of
//! candidate item identifiers, most-recent-first, bounded by a configured
//! limit. Channels are listed with an external tool (with a keyword-search
//! fallback); feeds are fetched over HTTP and parsed as RSS or Atom.
//!
//! Identifiers that fail the platform format check are dropped here and
//! never reach the resolver.

mod channel;
mod feed;

pub use channel::ChannelEnumerator;
pub use feed::FeedEnumerator;

use crate::config::{Source, SourceKind};
use crate::error::Result;
use crate::filter::ItemMetadata;
use crate::runner::ProcessRunner;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;

/// An item identifier discovered from a source, pending metadata filtering
/// and resolution.
#[derive(Debug, Clone)]
pub struct CandidateItem {
    pub source_id: String,
    pub item_id: String,
    /// Populated lazily by the metadata filter.
    pub metadata: Option<ItemMetadata>,
}

impl CandidateItem {
    pub fn new(source_id: &str, item_id: &str) -> Self {
        Self {
            source_id: source_id.to_string(),
            item_id: item_id.to_string(),
            metadata: None,
        }
    }
}

/// Matches a bare 11-character platform item ID.
pub(crate) fn item_id_regex() -> Regex {
    Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("Invalid regex")
}

/// Finds an item ID embedded in a watch/share URL.
pub(crate) fn linked_item_id_regex() -> Regex {
    Regex::new(r"(?:watch\?v=|youtu\.be/|/embed/|/shorts/|/v/)([a-zA-Z0-9_-]{11})")
        .expect("Invalid regex")
}

/// Dispatches enumeration on the source kind.
pub struct ItemEnumerator {
    channel: ChannelEnumerator,
    feed: FeedEnumerator,
}

impl ItemEnumerator {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        http: reqwest::Client,
        list_timeout: Duration,
    ) -> Self {
        Self {
            channel: ChannelEnumerator::new(runner, list_timeout),
            feed: FeedEnumerator::new(http),
        }
    }

    /// Enumerate up to `limit` candidate items for the source.
    ///
    /// Failure here is fatal for this source only; the caller continues
    /// with remaining sources.
    pub async fn enumerate(&self, source: &Source, limit: usize) -> Result<Vec<CandidateItem>> {
        match source.kind {
            SourceKind::Channel => self.channel.enumerate(source, limit).await,
            SourceKind::Feed => self.feed.enumerate(source, limit).await,
        }
    }
}
