//! Feed enumeration over HTTP.
//!
//! Fetches the source endpoint and parses it as RSS first, then Atom
//! (platform channel feeds are Atom; many aggregators serve RSS). Entries
//! that do not carry a syntactically valid item id are dropped.

use super::{linked_item_id_regex, CandidateItem};
use crate::config::Source;
use crate::error::{Result, SkrybaError};
use regex::Regex;
use tracing::{debug, warn};

pub struct FeedEnumerator {
    http: reqwest::Client,
    link_regex: Regex,
}

impl FeedEnumerator {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            link_regex: linked_item_id_regex(),
        }
    }

    pub async fn enumerate(&self, source: &Source, limit: usize) -> Result<Vec<CandidateItem>> {
        let response = self
            .http
            .get(&source.endpoint)
            .send()
            .await
            .map_err(|e| SkrybaError::Enumeration(format!("Feed fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(SkrybaError::Enumeration(format!(
                "Feed {} returned HTTP {}",
                source.endpoint,
                response.status()
            )));
        }

        let content = response
            .text()
            .await
            .map_err(|e| SkrybaError::Enumeration(format!("Feed read failed: {}", e)))?;

        let items = self.parse_feed(source, &content, limit)?;
        if items.is_empty() {
            warn!(source = %source.id, "Feed contained no usable items");
        }
        Ok(items)
    }

    /// Parse feed content, trying RSS first and falling back to Atom.
    fn parse_feed(&self, source: &Source, content: &str, limit: usize) -> Result<Vec<CandidateItem>> {
        match self.parse_as_rss(source, content, limit) {
            Ok(items) => Ok(items),
            Err(rss_err) => {
                debug!("Not RSS ({}), trying Atom", rss_err);
                self.parse_as_atom(source, content, limit).map_err(|atom_err| {
                    SkrybaError::Enumeration(format!(
                        "Feed is neither RSS nor Atom. RSS error: {}. Atom error: {}",
                        rss_err, atom_err
                    ))
                })
            }
        }
    }

    fn parse_as_rss(&self, source: &Source, content: &str, limit: usize) -> Result<Vec<CandidateItem>> {
        let channel = content
            .parse::<rss::Channel>()
            .map_err(|e| SkrybaError::Parse(format!("RSS parse error: {}", e)))?;

        let mut items = Vec::new();
        for item in channel.items() {
            if items.len() >= limit {
                break;
            }
            let link = item.link().or_else(|| item.guid().map(|g| g.value()));
            if let Some(id) = link.and_then(|l| self.extract_item_id(l)) {
                items.push(CandidateItem::new(&source.id, &id));
            } else {
                debug!(source = %source.id, "Dropping feed entry without a valid item id");
            }
        }
        Ok(items)
    }

    fn parse_as_atom(&self, source: &Source, content: &str, limit: usize) -> Result<Vec<CandidateItem>> {
        let feed = atom_syndication::Feed::read_from(content.as_bytes())
            .map_err(|e| SkrybaError::Parse(format!("Atom parse error: {}", e)))?;

        let mut items = Vec::new();
        for entry in feed.entries() {
            if items.len() >= limit {
                break;
            }
            let id = entry
                .links()
                .iter()
                .find_map(|l| self.extract_item_id(l.href()))
                .or_else(|| self.extract_item_id(entry.id()));
            if let Some(id) = id {
                items.push(CandidateItem::new(&source.id, &id));
            } else {
                debug!(source = %source.id, "Dropping feed entry without a valid item id");
            }
        }
        Ok(items)
    }

    fn extract_item_id(&self, value: &str) -> Option<String> {
        // Channel feeds use "yt:video:<id>" entry ids; watch URLs carry the
        // id in the query string.
        if let Some(id) = value.strip_prefix("yt:video:") {
            if super::item_id_regex().is_match(id) {
                return Some(id.to_string());
            }
        }
        self.link_regex
            .captures(value)
            .map(|caps| caps[1].to_string())
    }
}
