//! Modification times as integer file-time ticks.
//!
//! The cache file stores modification times as a signed count of 100 ns
//! ticks since 1601-01-01 00:00:00 UTC (the Windows `FILETIME` epoch).
//! Observed times are always converted to ticks before they are compared,
//! so a value read back from disk compares equal to the one that was
//! written.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

/// Ticks per second.
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Nanoseconds per tick.
const NANOS_PER_TICK: i128 = 100;

/// Ticks between 1601-01-01 and 1970-01-01.
const UNIX_EPOCH_TICKS: i64 = 11_644_473_600 * TICKS_PER_SECOND;

/// A file modification time in 100 ns ticks since 1601-01-01 UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModifiedTime(i64);

impl ModifiedTime {
    /// Wrap a raw tick count.
    #[must_use]
    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    /// The raw tick count.
    #[must_use]
    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// Convert a platform timestamp, truncating to whole ticks.
    ///
    /// Times outside the representable range saturate.
    #[must_use]
    pub fn from_system_time(time: SystemTime) -> Self {
        let nanos: i128 = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_nanos() as i128,
            Err(before) => -(before.duration().as_nanos() as i128),
        };
        let ticks = i128::from(UNIX_EPOCH_TICKS) + nanos.div_euclid(NANOS_PER_TICK);
        Self(ticks.clamp(i128::from(i64::MIN), i128::from(i64::MAX)) as i64)
    }

    /// Read the current modification time of `path`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from reading the metadata.
    pub fn of_path(path: &std::path::Path) -> std::io::Result<Self> {
        let modified = std::fs::metadata(path)?.modified()?;
        Ok(Self::from_system_time(modified))
    }
}

impl From<SystemTime> for ModifiedTime {
    fn from(time: SystemTime) -> Self {
        Self::from_system_time(time)
    }
}

impl fmt::Display for ModifiedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ModifiedTime {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(Self)
    }
}
