//! Cache entry definitions and the staleness rules.

use std::fmt;
use std::path::{Component, Path};
use std::str::FromStr;

use serde::Serialize;

use super::timestamp::ModifiedTime;
use super::{CacheError, CacheResult};
use crate::hex;
use crate::scanner::{ContentHasher, FileEntry, Hash, HASH_LEN};

/// Field separator of the persisted format.
const FIELD_SEPARATOR: char = '\t';

/// Number of fields in a persisted line.
const FIELD_COUNT: usize = 3;

/// A single file's record in the hash cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    name: String,
    modified: ModifiedTime,
    hash: Hash,
}

/// A digest computed during a check that has not been committed yet.
///
/// Handing this to [`CacheEntry::commit`] lets the commit reuse the work
/// instead of reading the file a second time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recomputation {
    modified: ModifiedTime,
    hash: Hash,
}

impl Recomputation {
    /// Modification time observed when the digest was computed.
    #[must_use]
    pub fn modified(&self) -> ModifiedTime {
        self.modified
    }

    /// The freshly computed digest.
    #[must_use]
    pub fn hash(&self) -> &Hash {
        &self.hash
    }
}

/// Outcome of a staleness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Staleness {
    /// The recorded hash still describes the file.
    Unchanged,
    /// The file no longer exists.
    Missing,
    /// The file's content differs from the recorded hash.
    Modified,
}

impl Staleness {
    /// Lowercase name, as used in reports.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Missing => "missing",
            Self::Modified => "modified",
        }
    }
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`CacheEntry::check`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    /// What the check concluded
    pub staleness: Staleness,
    /// The digest to hand to the next commit, if one is known
    pub recomputation: Option<Recomputation>,
}

impl Check {
    /// Whether the entry counts as changed (modified or missing).
    #[must_use]
    pub fn has_changed(&self) -> bool {
        self.staleness != Staleness::Unchanged
    }
}

/// Observed state of an entry's file.
enum Observed {
    Missing,
    Present(ModifiedTime),
}

impl CacheEntry {
    /// Create an entry from its parts.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidName`] if `name` is not a plain relative
    /// path or contains a tab or line break.
    pub fn new(name: impl Into<String>, modified: ModifiedTime, hash: Hash) -> CacheResult<Self> {
        let name = name.into();
        if let Err(reason) = validate_name(&name) {
            log::debug!("Rejected entry name {:?}: {}", name, reason);
            return Err(CacheError::InvalidName(name));
        }
        Ok(Self {
            name,
            modified,
            hash,
        })
    }

    /// Hash a listed file and record it as fully committed.
    ///
    /// The modification time is the one observed when the file was listed,
    /// so a write that races the hashing shows up as a change next time.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidName`] for names that cannot be
    /// persisted and [`CacheError::Hash`] if the file cannot be read.
    pub fn from_file<H>(file: &FileEntry, hasher: &H) -> CacheResult<Self>
    where
        H: ContentHasher + ?Sized,
    {
        let name = file
            .file_name()
            .ok_or_else(|| CacheError::InvalidName(file.path.to_string_lossy().into_owned()))?;
        let hash = hasher.full_hash(&file.path)?;
        Self::new(name, ModifiedTime::from_system_time(file.modified), hash)
    }

    /// File name relative to the cache root.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Modification time at which [`hash`](Self::hash) was last known valid.
    #[must_use]
    pub fn modified(&self) -> ModifiedTime {
        self.modified
    }

    /// The committed content digest.
    #[must_use]
    pub fn hash(&self) -> &Hash {
        &self.hash
    }

    /// Check whether the file under `root` still matches this entry.
    ///
    /// Decision order:
    /// 1. Missing file: changed, nothing computed.
    /// 2. Modification time equals the committed one: unchanged, no read.
    /// 3. Modification time equals `pending`'s: compare against the pending
    ///    digest, no read. The token is carried forward.
    /// 4. Otherwise rehash and return the result as a new token.
    ///
    /// # Errors
    ///
    /// Returns an error if the file's metadata cannot be read for a reason
    /// other than absence, or if rehashing fails.
    pub fn check<H>(
        &self,
        root: &Path,
        hasher: &H,
        pending: Option<&Recomputation>,
    ) -> CacheResult<Check>
    where
        H: ContentHasher + ?Sized,
    {
        let path = root.join(&self.name);
        let current = match observe(&path)? {
            Observed::Missing => {
                log::trace!("{}: missing", self.name);
                return Ok(Check {
                    staleness: Staleness::Missing,
                    recomputation: None,
                });
            }
            Observed::Present(current) => current,
        };

        if current == self.modified {
            log::trace!("{}: timestamp unchanged", self.name);
            return Ok(Check {
                staleness: Staleness::Unchanged,
                recomputation: None,
            });
        }

        let recomputation = match pending {
            Some(pending) if pending.modified == current => {
                log::trace!("{}: reusing pending hash", self.name);
                pending.clone()
            }
            _ => {
                log::trace!("{}: timestamp moved, rehashing", self.name);
                Recomputation {
                    modified: current,
                    hash: hasher.full_hash(&path)?,
                }
            }
        };

        let staleness = if recomputation.hash == self.hash {
            Staleness::Unchanged
        } else {
            Staleness::Modified
        };
        Ok(Check {
            staleness,
            recomputation: Some(recomputation),
        })
    }

    /// Check without any pending state.
    ///
    /// # Errors
    ///
    /// See [`check`](Self::check).
    pub fn has_changed<H>(&self, root: &Path, hasher: &H) -> CacheResult<bool>
    where
        H: ContentHasher + ?Sized,
    {
        self.check(root, hasher, None).map(|check| check.has_changed())
    }

    /// Bring the committed hash and time up to date with the file.
    ///
    /// Reuses `pending` when its time matches the file's current one and
    /// rehashes otherwise. The token is consumed whichever branch runs.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Io`] if the file is gone or its metadata cannot
    /// be read, and [`CacheError::Hash`] if rehashing fails.
    pub fn commit<H>(
        &mut self,
        root: &Path,
        hasher: &H,
        pending: Option<Recomputation>,
    ) -> CacheResult<()>
    where
        H: ContentHasher + ?Sized,
    {
        let path = root.join(&self.name);
        let current = ModifiedTime::of_path(&path).map_err(|e| CacheError::io(&path, e))?;

        if current == self.modified {
            return Ok(());
        }

        match pending {
            Some(pending) if pending.modified == current => {
                log::trace!("{}: committing pending hash", self.name);
                self.hash = pending.hash;
            }
            _ => {
                log::trace!("{}: committing fresh hash", self.name);
                self.hash = hasher.full_hash(&path)?;
            }
        }
        self.modified = current;
        Ok(())
    }

    /// Render this entry as one line of the cache file (without newline).
    #[must_use]
    pub fn serialize(&self) -> String {
        self.to_string()
    }

    /// Parse one line of the cache file.
    ///
    /// A trailing carriage return is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Format`] carrying the raw line if the field
    /// count, name, time or digest is invalid.
    pub fn parse(line: &str) -> CacheResult<Self> {
        let record = line.strip_suffix('\r').unwrap_or(line);
        let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
        let [name, modified, hash] = fields[..] else {
            return Err(CacheError::format(
                line,
                format!(
                    "expected {} tab-separated fields, found {}",
                    FIELD_COUNT,
                    fields.len()
                ),
            ));
        };

        validate_name(name).map_err(|reason| CacheError::format(line, reason))?;

        let modified = modified
            .parse::<ModifiedTime>()
            .map_err(|e| CacheError::format(line, format!("invalid modification time: {}", e)))?;

        let bytes =
            hex::decode(hash).map_err(|e| CacheError::format(line, format!("invalid hash: {}", e)))?;
        let hash = Hash::try_from(bytes.as_slice()).map_err(|_| {
            CacheError::format(
                line,
                format!("hash is {} bytes, expected {}", bytes.len(), HASH_LEN),
            )
        })?;

        Ok(Self {
            name: name.to_string(),
            modified,
            hash,
        })
    }
}

impl fmt::Display for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.name,
            self.modified,
            hex::encode(&self.hash),
            sep = FIELD_SEPARATOR
        )
    }
}

impl FromStr for CacheEntry {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Read the modification time of `path`, treating absence as a result.
fn observe(path: &Path) -> CacheResult<Observed> {
    match ModifiedTime::of_path(path) {
        Ok(modified) => Ok(Observed::Present(modified)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Observed::Missing),
        Err(e) => Err(CacheError::io(path, e)),
    }
}

/// Check that a name stays inside the root and fits on one cache line.
pub(crate) fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("empty file name".to_string());
    }
    if name.contains(['\t', '\n', '\r']) {
        return Err("file name contains a tab or line break".to_string());
    }
    let mut parts = Vec::new();
    for component in Path::new(name).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy()),
            _ => return Err("file name must be a plain relative path".to_string()),
        }
    }
    // `components` drops interior `.` and repeated separators
    if parts.join("/") != name {
        return Err("file name must be a plain relative path".to_string());
    }
    Ok(())
}
