//! Human-readable output for `check` results.
//!
//! ```text
//! modified  report.pdf
//! missing   old-notes.txt
//!
//! 2 of 120 files changed (1 modified, 1 missing)
//! ```

use std::io::{self, Write};

use yansi::Paint;

use super::CheckReport;
use crate::cache::Staleness;

/// Text renderer for a [`CheckReport`].
pub struct TextOutput<'a> {
    report: &'a CheckReport,
}

impl<'a> TextOutput<'a> {
    #[must_use]
    pub fn new(report: &'a CheckReport) -> Self {
        Self { report }
    }

    /// Write one line per change, then a summary line.
    ///
    /// Colors follow the global `yansi` switch.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from `writer`.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let report = self.report;
        for change in &report.changes {
            // Pad before painting so escape codes don't skew the columns
            let label = format!("{:<10}", change.status.as_str());
            let label = match change.status {
                Staleness::Modified => label.yellow(),
                Staleness::Missing => label.red(),
                Staleness::Unchanged => label.green(),
            };
            writeln!(writer, "{}{}", label, change.name)?;
        }

        if !report.has_changes() {
            writeln!(
                writer,
                "{}",
                format!("All {} files unchanged", report.total).green()
            )?;
            return Ok(());
        }

        writeln!(writer)?;
        writeln!(
            writer,
            "{} of {} files changed ({} modified, {} missing)",
            report.changes.len().bold(),
            report.total,
            report.count(Staleness::Modified),
            report.count(Staleness::Missing)
        )?;
        if report.committed {
            writeln!(writer, "{}", "Cache updated".dim())?;
        }
        Ok(())
    }
}
