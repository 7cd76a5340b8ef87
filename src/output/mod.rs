//! Report formatters for `check` results.
//!
//! - [`text`]: colored listing for terminals
//! - [`json`]: machine-readable [`json::ChangeReport`]
//!
//! Both render the same [`CheckReport`].

pub mod json;
pub mod text;

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Serialize;

use crate::cache::{CacheEntry, Staleness};
use crate::hex;

pub use json::{ChangeReport, JsonOutputError};
pub use text::TextOutput;

/// A cached file that no longer matches its entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    /// File name relative to the root
    pub name: String,
    /// Why the file counts as changed
    pub status: Staleness,
    /// Hash recorded in the cache, as uppercase hex
    pub recorded_hash: String,
    /// Modification time recorded in the cache, in ticks
    pub recorded_modified: i64,
}

impl Change {
    fn new(entry: &CacheEntry, status: Staleness) -> Self {
        Self {
            name: entry.name().to_string(),
            status,
            recorded_hash: hex::encode(entry.hash()),
            recorded_modified: entry.modified().ticks(),
        }
    }
}

/// Outcome of checking one cache.
#[derive(Debug, Clone)]
pub struct CheckReport {
    /// Directory the cache describes
    pub root: PathBuf,
    /// Number of entries checked
    pub total: usize,
    /// Entries that changed or went missing, in cache order
    pub changes: Vec<Change>,
    /// Whether the changes were committed and the cache rewritten
    pub committed: bool,
    /// Time spent checking
    pub duration: Duration,
}

impl CheckReport {
    /// Build a report from per-entry check results.
    #[must_use]
    pub fn new(root: &Path, results: &[(&CacheEntry, Staleness)], duration: Duration) -> Self {
        Self {
            root: root.to_path_buf(),
            total: results.len(),
            changes: results
                .iter()
                .filter(|(_, status)| *status != Staleness::Unchanged)
                .map(|(entry, status)| Change::new(entry, *status))
                .collect(),
            committed: false,
            duration,
        }
    }

    /// Whether any entry changed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    /// Number of changes with the given status.
    #[must_use]
    pub fn count(&self, status: Staleness) -> usize {
        self.changes.iter().filter(|c| c.status == status).count()
    }
}
