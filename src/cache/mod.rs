//! Hash caching module for hashcheck.
//!
//! This module keeps a persisted, per-file content hash for the files of
//! one directory and decides which of them changed since the cache was
//! written, without rehashing files whose modification time has not moved.
//!
//! # Architecture
//!
//! * [`entry`]: One file's record and the staleness rules.
//! * [`list`]: The ordered collection bound to a root directory; bulk
//!   load, check, commit and write.
//! * [`timestamp`]: Modification times as integer file-time ticks.
//!
//! # Cache Invalidation
//!
//! An entry is trusted while the file's modification time equals the one
//! recorded with its hash. When the time moves, the file is rehashed and
//! the digests are compared. A rehash done during a check is handed to the
//! following commit as a [`Recomputation`] token, so one run never hashes
//! the same file twice.
//!
//! A file rewritten with its original modification time restored is
//! reported as unchanged. Rehashing every file to catch that case would
//! defeat the cache.

pub mod entry;
pub mod list;
pub mod timestamp;

use std::path::PathBuf;

use crate::scanner::{HashError, ScanError};

pub use entry::{CacheEntry, Check, Recomputation, Staleness};
pub use list::{CacheList, ScanOptions};
pub use timestamp::ModifiedTime;

/// Errors raised by the hash cache.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// The root directory or cache file does not exist.
    #[error("Not found: {0}")]
    NotFound(PathBuf),

    /// A persisted line could not be parsed.
    #[error("Malformed cache line {line:?}: {reason}")]
    Format {
        /// The raw line as read from the file
        line: String,
        /// What was wrong with it
        reason: String,
    },

    /// A file name that cannot be stored in the cache.
    #[error("Invalid cache entry name {0:?}")]
    InvalidName(String),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A file could not be hashed.
    #[error(transparent)]
    Hash(#[from] HashError),

    /// The directory could not be listed.
    #[error(transparent)]
    Scan(#[from] ScanError),

    /// The hashing thread pool could not be started.
    #[error("Failed to start hashing threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(line: &str, reason: impl Into<String>) -> Self {
        Self::Format {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}
