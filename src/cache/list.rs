//! The cache of one directory: load, check, commit and write.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use rayon::prelude::*;

use super::entry::{validate_name, CacheEntry, Recomputation, Staleness};
use super::{CacheError, CacheResult};
use crate::progress::ProgressCallback;
use crate::scanner::{ContentHasher, FileEntry, Walker, WalkerConfig};

/// Phase name reported to progress callbacks while hashing a directory.
pub const HASHING_PHASE: &str = "hashing";

/// Options for [`CacheList::from_directory_with`].
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Which files of the directory to list.
    pub walker: WalkerConfig,
    /// Hashing threads. Zero or one hashes sequentially, which is the
    /// fastest choice when every file lives on the same disk.
    pub io_threads: usize,
}

/// Ordered per-file hash cache bound to a root directory.
///
/// Entries are keyed by file name and kept in insertion order, which is
/// also the order they are checked, committed and written in.
///
/// Digests computed by [`changed_entries`](Self::changed_entries) are held
/// until the next [`commit_all`](Self::commit_all), so checking and then
/// committing a changed file reads it only once.
#[derive(Debug, Clone)]
pub struct CacheList {
    root: PathBuf,
    entries: IndexMap<String, CacheEntry>,
    pending: HashMap<String, Recomputation>,
}

impl PartialEq for CacheList {
    /// Lists are equal when their roots and committed entries match, in
    /// order. Pending recomputations are not compared.
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.entries.values().eq(other.entries.values())
    }
}

impl Eq for CacheList {}

impl CacheList {
    /// Create an empty cache for `root`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if a relative `root` cannot be made
    /// absolute.
    pub fn new(root: &Path) -> CacheResult<Self> {
        Ok(Self {
            root: absolute_root(root)?,
            entries: IndexMap::new(),
            pending: HashMap::new(),
        })
    }

    /// Hash every file directly inside `path`, one after another.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] if `path` does not exist, and the
    /// first listing or hashing error otherwise.
    pub fn from_directory<H>(path: &Path, hasher: &H) -> CacheResult<Self>
    where
        H: ContentHasher + Sync + ?Sized,
    {
        Self::from_directory_with(path, hasher, &ScanOptions::default(), None)
    }

    /// Hash every file directly inside `path` with explicit options.
    ///
    /// Entries follow the order the platform listed the files in, whatever
    /// the thread count. Files whose names cannot be stored in the cache
    /// are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] if `path` does not exist, and the
    /// first listing or hashing error otherwise. A file that disappears
    /// between listing and hashing is an error.
    pub fn from_directory_with<H>(
        path: &Path,
        hasher: &H,
        options: &ScanOptions,
        progress: Option<&dyn ProgressCallback>,
    ) -> CacheResult<Self>
    where
        H: ContentHasher + Sync + ?Sized,
    {
        if !path.try_exists().map_err(|e| CacheError::io(path, e))? {
            return Err(CacheError::NotFound(path.to_path_buf()));
        }

        let mut list = Self::new(path)?;
        let files: Vec<FileEntry> = Walker::new(&list.root, options.walker.clone())
            .list_files()?
            .into_iter()
            .filter(is_persistable)
            .collect();

        if let Some(progress) = progress {
            progress.on_phase_start(HASHING_PHASE, files.len());
        }

        let done = AtomicUsize::new(0);
        let hash_one = |file: &FileEntry| -> CacheResult<CacheEntry> {
            let entry = CacheEntry::from_file(file, hasher)?;
            let current = done.fetch_add(1, Ordering::Relaxed) + 1;
            if let Some(progress) = progress {
                progress.on_progress(current, entry.name());
                progress.on_item_completed(file.size);
            }
            Ok(entry)
        };

        let entries: Vec<CacheEntry> = if options.io_threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(options.io_threads)
                .build()?;
            pool.install(|| files.par_iter().map(hash_one).collect::<CacheResult<_>>())?
        } else {
            files.iter().map(hash_one).collect::<CacheResult<_>>()?
        };

        if let Some(progress) = progress {
            progress.on_phase_end(HASHING_PHASE);
        }

        for entry in entries {
            list.entries.insert(entry.name().to_string(), entry);
        }
        log::debug!(
            "Hashed {} files ({}) in {}",
            list.len(),
            bytesize::ByteSize::b(files.iter().map(|f| f.size).sum()),
            list.root.display()
        );
        Ok(list)
    }

    /// Load a cache file written by [`write_to`](Self::write_to).
    ///
    /// Blank and whitespace-only lines are skipped. Loading stops at the
    /// first bad line.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] if `path` does not exist and
    /// [`CacheError::Format`], carrying the raw line, for a line that does
    /// not parse or repeats an earlier file name.
    pub fn from_persisted_file(root: &Path, path: &Path) -> CacheResult<Self> {
        let file = File::open(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CacheError::NotFound(path.to_path_buf()),
            _ => CacheError::io(path, e),
        })?;

        let mut list = Self::new(root)?;
        for (index, bytes) in BufReader::new(file).split(b'\n').enumerate() {
            let bytes = bytes.map_err(|e| CacheError::io(path, e))?;
            let line = String::from_utf8(bytes).map_err(|e| {
                CacheError::format(
                    &String::from_utf8_lossy(e.as_bytes()),
                    format!("line {} is not valid UTF-8", index + 1),
                )
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let entry = CacheEntry::parse(&line)?;
            if list.entries.contains_key(entry.name()) {
                return Err(CacheError::format(
                    &line,
                    format!("duplicate entry for {}", entry.name()),
                ));
            }
            list.entries.insert(entry.name().to_string(), entry);
        }

        log::debug!("Loaded {} entries from {}", list.len(), path.display());
        Ok(list)
    }

    /// Check every entry once, in order, and report each outcome.
    ///
    /// Digests computed along the way are kept for the next
    /// [`commit_all`](Self::commit_all).
    ///
    /// # Errors
    ///
    /// Stops at the first entry whose check fails.
    pub fn check_all<H>(&mut self, hasher: &H) -> CacheResult<Vec<(&CacheEntry, Staleness)>>
    where
        H: ContentHasher + ?Sized,
    {
        let Self {
            root,
            entries,
            pending,
        } = self;

        let mut results = Vec::with_capacity(entries.len());
        for (name, entry) in entries.iter() {
            let check = entry.check(root, hasher, pending.get(name))?;
            if let Some(recomputation) = check.recomputation {
                pending.insert(name.clone(), recomputation);
            }
            results.push((entry, check.staleness));
        }
        Ok(results)
    }

    /// The entries whose files changed or disappeared, in order.
    ///
    /// # Errors
    ///
    /// Stops at the first entry whose check fails.
    pub fn changed_entries<H>(&mut self, hasher: &H) -> CacheResult<Vec<&CacheEntry>>
    where
        H: ContentHasher + ?Sized,
    {
        let results = self.check_all(hasher)?;
        Ok(results
            .into_iter()
            .filter(|(_, staleness)| *staleness != Staleness::Unchanged)
            .map(|(entry, _)| entry)
            .collect())
    }

    /// Commit every entry, in order, whether or not it was checked.
    ///
    /// Each entry's pending digest is consumed by its commit.
    ///
    /// # Errors
    ///
    /// Stops at the first entry whose commit fails, e.g. because its file
    /// was deleted. See [`prune_missing`](Self::prune_missing).
    pub fn commit_all<H>(&mut self, hasher: &H) -> CacheResult<()>
    where
        H: ContentHasher + ?Sized,
    {
        for (name, entry) in &mut self.entries {
            let pending = self.pending.remove(name);
            entry.commit(&self.root, hasher, pending)?;
        }
        Ok(())
    }

    /// Write one line per entry, in order, replacing `path`.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> CacheResult<()> {
        let file = File::create(path).map_err(|e| CacheError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        for entry in self.entries.values() {
            writeln!(writer, "{}", entry).map_err(|e| CacheError::io(path, e))?;
        }
        writer.flush().map_err(|e| CacheError::io(path, e))?;
        log::debug!("Wrote {} entries to {}", self.len(), path.display());
        Ok(())
    }

    /// Remove entries whose files no longer exist.
    ///
    /// Returns the removed names, in order.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if existence cannot be determined.
    pub fn prune_missing(&mut self) -> CacheResult<Vec<String>> {
        let mut missing = Vec::new();
        for name in self.entries.keys() {
            let path = self.root.join(name);
            if !path.try_exists().map_err(|e| CacheError::io(&path, e))? {
                missing.push(name.clone());
            }
        }
        for name in &missing {
            self.remove(name);
        }
        Ok(missing)
    }

    /// Files in the root directory that have no entry yet.
    ///
    /// # Errors
    ///
    /// Returns the listing error, if any.
    pub fn untracked_files(&self, config: &WalkerConfig) -> CacheResult<Vec<FileEntry>> {
        let files = Walker::new(&self.root, config.clone()).list_files()?;
        Ok(files
            .into_iter()
            .filter(is_persistable)
            .filter(|file| file.file_name().is_some_and(|name| !self.contains(name)))
            .collect())
    }

    /// Hash a listed file and add it as a committed entry.
    ///
    /// # Errors
    ///
    /// Returns the hashing error, if any.
    pub fn track<H>(&mut self, file: &FileEntry, hasher: &H) -> CacheResult<&CacheEntry>
    where
        H: ContentHasher + ?Sized,
    {
        let entry = CacheEntry::from_file(file, hasher)?;
        let name = entry.name().to_string();
        self.insert(entry);
        self.entries
            .get(&name)
            .ok_or(CacheError::InvalidName(name))
    }

    /// Add or replace an entry.
    ///
    /// A replaced entry keeps its position and loses any pending digest.
    pub fn insert(&mut self, entry: CacheEntry) -> Option<CacheEntry> {
        self.pending.remove(entry.name());
        self.entries.insert(entry.name().to_string(), entry)
    }

    /// Remove an entry, keeping the order of the others.
    pub fn remove(&mut self, name: &str) -> Option<CacheEntry> {
        self.pending.remove(name);
        self.entries.shift_remove(name)
    }

    /// Look up an entry by file name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&CacheEntry> {
        self.entries.get(name)
    }

    /// Whether an entry exists for `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Whether a check left an uncommitted digest for `name`.
    #[must_use]
    pub fn has_pending(&self, name: &str) -> bool {
        self.pending.contains_key(name)
    }

    /// Iterate over entries in order.
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The directory entry names are resolved against.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Make `root` absolute without touching the filesystem.
fn absolute_root(root: &Path) -> CacheResult<PathBuf> {
    std::path::absolute(root).map_err(|e| CacheError::io(root, e))
}

/// Whether a listed file's name can be stored, warning when it cannot.
fn is_persistable(file: &FileEntry) -> bool {
    match file.file_name() {
        Some(name) => match validate_name(name) {
            Ok(()) => true,
            Err(reason) => {
                log::warn!("Skipping {}: {}", file.path.display(), reason);
                false
            }
        },
        None => {
            log::warn!("Skipping {}: file name is not valid UTF-8", file.path.display());
            false
        }
    }
}
