//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//! This module provides the [`ContentHasher`] trait used by the cache
//! engine and the [`Hasher`] struct, which computes BLAKE3 digests of file
//! contents by streaming them through a fixed-size buffer.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use super::HashError;

/// Length in bytes of a content digest.
pub const HASH_LEN: usize = blake3::OUT_LEN;

/// A content digest.
pub type Hash = [u8; HASH_LEN];

/// Default read buffer size (64 KiB).
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Computes a fixed-length digest of a byte stream.
///
/// The cache engine only ever talks to this trait, so tests can count or
/// fake hashing passes.
pub trait ContentHasher {
    /// Hash everything `reader` yields, in order, until end of stream.
    ///
    /// # Errors
    ///
    /// Returns the first read error encountered.
    fn hash_reader(&self, reader: &mut dyn Read) -> io::Result<Hash>;

    /// Open `path`, hash its full contents, and close it again.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or a read fails.
    fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let mut file =
            File::open(path).map_err(|e| HashError::from_io(path.to_path_buf(), e))?;
        let hash = self
            .hash_reader(&mut file)
            .map_err(|e| HashError::from_io(path.to_path_buf(), e))?;
        log::trace!("Hashed {}", path.display());
        Ok(hash)
    }
}

/// Streaming BLAKE3 hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
}

impl Hasher {
    /// Create a hasher with the default 64 KiB buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Create a hasher with a custom read buffer size.
    ///
    /// A size of zero falls back to [`DEFAULT_BUFFER_SIZE`].
    #[must_use]
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: if buffer_size == 0 {
                DEFAULT_BUFFER_SIZE
            } else {
                buffer_size
            },
        }
    }

    /// The read buffer size in bytes.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentHasher for Hasher {
    fn hash_reader(&self, reader: &mut dyn Read) -> io::Result<Hash> {
        let mut hasher = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.buffer_size];
        loop {
            let read = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..read]);
        }
        Ok(*hasher.finalize().as_bytes())
    }
}
