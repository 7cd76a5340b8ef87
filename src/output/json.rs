//! JSON output for `check` results.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "root": "/data/archive",
//!   "generated_at": "2024-05-01T12:00:00Z",
//!   "changes": [
//!     {
//!       "name": "report.pdf",
//!       "status": "modified",
//!       "recorded_hash": "3A7F...",
//!       "recorded_modified": 133590000000000000
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 120,
//!     "changed_files": 1,
//!     "modified_files": 1,
//!     "missing_files": 0,
//!     "committed": false,
//!     "check_duration_ms": 14,
//!     "exit_code": 2,
//!     "exit_code_name": "HC002"
//!   }
//! }
//! ```

use std::io::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Change, CheckReport};
use crate::cache::Staleness;
use crate::error::ExitCode;

/// Totals of a check.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    pub total_files: usize,
    pub changed_files: usize,
    pub modified_files: usize,
    pub missing_files: usize,
    pub committed: bool,
    pub check_duration_ms: u64,
    pub exit_code: i32,
    pub exit_code_name: String,
}

/// Complete JSON document for one check.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeReport {
    pub root: String,
    pub generated_at: DateTime<Utc>,
    pub changes: Vec<Change>,
    pub summary: JsonSummary,
}

impl ChangeReport {
    /// Build the JSON document, stamped with the current time.
    #[must_use]
    pub fn new(report: &CheckReport, exit_code: ExitCode) -> Self {
        Self {
            root: report.root.to_string_lossy().into_owned(),
            generated_at: Utc::now(),
            changes: report.changes.clone(),
            summary: JsonSummary {
                total_files: report.total,
                changed_files: report.changes.len(),
                modified_files: report.count(Staleness::Modified),
                missing_files: report.count(Staleness::Missing),
                committed: report.committed,
                check_duration_ms: u64::try_from(report.duration.as_millis()).unwrap_or(u64::MAX),
                exit_code: exit_code.as_i32(),
                exit_code_name: exit_code.code_prefix().to_string(),
            },
        }
    }

    /// Serialize as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize as indented JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the document followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur while writing JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error while writing JSON: {0}")]
    Io(#[from] std::io::Error),
}
