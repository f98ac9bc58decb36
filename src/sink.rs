//! Append-only output sink.
//!
//! One JSONL file per source, named deterministically from the source
//! identifier. Records are immutable once written; resume works by
//! memoizing the item identifiers already present in a source's file, so a
//! re-run skips work for anything already flushed (at-least-once, not
//! exactly-once: a crash between resolution and flush loses that item's
//! record and it will be reattempted).

use crate::error::{Result, SkrybaError};
use crate::resolve::{AcquisitionResult, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Persisted projection of an [`AcquisitionResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputRecord {
    pub fetched_at: DateTime<Utc>,
    pub source_id: String,
    pub item_id: String,
    pub language_used: String,
    pub tier: Tier,
    pub text: String,
}

impl OutputRecord {
    pub fn from_result(source_id: &str, result: AcquisitionResult) -> Self {
        Self {
            fetched_at: result.resolved_at,
            source_id: source_id.to_string(),
            item_id: result.item_id,
            language_used: result.language_used,
            tier: result.tier,
            text: result.text,
        }
    }
}

/// Per-source append-only record log.
///
/// There is exactly one writer per file by construction: items within one
/// source are processed sequentially, and each source maps to its own file.
pub struct OutputSink {
    dir: PathBuf,
    /// Item ids already present per source file, loaded lazily on first use.
    seen: HashMap<String, HashSet<String>>,
}

impl OutputSink {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            seen: HashMap::new(),
        })
    }

    /// Path of a source's output file.
    pub fn path_for(&self, source_id: &str) -> PathBuf {
        self.dir.join(format!("{}.jsonl", slugify(source_id)))
    }

    /// Whether a record for this item was already flushed on a previous run
    /// (or earlier in this one).
    pub fn already_has(&mut self, source_id: &str, item_id: &str) -> bool {
        self.seen_set(source_id).contains(item_id)
    }

    /// Append one record and flush before returning.
    pub fn append(&mut self, record: &OutputRecord) -> Result<()> {
        if record.text.trim().is_empty() {
            return Err(SkrybaError::Sink(format!(
                "Refusing to write empty text for item {}",
                record.item_id
            )));
        }

        let line = serde_json::to_string(record)?;
        let path = self.path_for(&record.source_id);

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        // One write for the whole line so a record is either fully present
        // or absent; never torn by an interrupt between writes.
        file.write_all(format!("{}\n", line).as_bytes())?;
        file.flush()?;

        self.seen_set(&record.source_id)
            .insert(record.item_id.clone());
        debug!(source = %record.source_id, item = %record.item_id, "Record appended");
        Ok(())
    }

    fn seen_set(&mut self, source_id: &str) -> &mut HashSet<String> {
        if !self.seen.contains_key(source_id) {
            let ids = self.scan(source_id);
            self.seen.insert(source_id.to_string(), ids);
        }
        self.seen.get_mut(source_id).expect("just inserted")
    }

    /// Scan a source's file for the item ids already written.
    fn scan(&self, source_id: &str) -> HashSet<String> {
        let path = self.path_for(source_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return HashSet::new(),
            Err(e) => {
                warn!(source = source_id, error = %e, "Cannot scan output file, resuming blind");
                return HashSet::new();
            }
        };

        let mut ids = HashSet::new();
        for line in content.lines().filter(|l| !l.trim().is_empty()) {
            match serde_json::from_str::<OutputRecord>(line) {
                Ok(record) => {
                    ids.insert(record.item_id);
                }
                Err(e) => {
                    // A torn trailing line from a crash mid-write; the item
                    // will simply be reattempted.
                    warn!(source = source_id, error = %e, "Skipping malformed record line");
                }
            }
        }
        debug!(source = source_id, count = ids.len(), "Resume scan complete");
        ids
    }
}

/// Deterministic file-safe name from a source identifier.
pub fn slugify(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches('-')
        .to_string()
}
