//! Directory listing for the hash cache.
//!
//! # Overview
//!
//! The cache tracks the files directly inside one directory, so the
//! [`Walker`] lists a single level only. It uses [`walkdir`] capped at
//! depth 1 and reports entries in whatever order the platform returns
//! them.
//!
//! # Features
//!
//! - Files only; subdirectories are never descended into
//! - Optional symlink following
//! - Gitignore-style pattern matching via the `ignore` crate
//! - Hidden file filtering
//! - Exact-path exclusion (used to keep the cache file out of its own cache)
//!
//! # Example
//!
//! ```no_run
//! use hashcheck::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/data/archive"), WalkerConfig::default());
//! let files = walker.list_files().unwrap();
//! println!("Found {} files", files.len());
//! ```

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::WalkDir;

use super::{FileEntry, ScanError, WalkerConfig};

/// Non-recursive directory lister.
#[derive(Debug)]
pub struct Walker {
    /// Directory to list
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given directory.
    ///
    /// # Arguments
    ///
    /// * `path` - Directory to list
    /// * `config` - Walker configuration options
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    /// Build gitignore matcher from config patterns.
    fn build_gitignore(&self) -> Option<Gitignore> {
        if self.config.ignore_patterns.is_empty() {
            return None;
        }

        let mut builder = GitignoreBuilder::new(&self.root);
        for pattern in &self.config.ignore_patterns {
            if let Err(e) = builder.add_line(None, pattern) {
                log::warn!("Invalid ignore pattern '{}': {}", pattern, e);
            }
        }

        match builder.build() {
            Ok(gitignore) if gitignore.is_empty() => None,
            Ok(gitignore) => Some(gitignore),
            Err(e) => {
                log::warn!("Failed to build ignore patterns: {}", e);
                None
            }
        }
    }

    /// Check if a file should be skipped by name or pattern.
    fn should_skip(&self, path: &Path, gitignore: Option<&Gitignore>) -> bool {
        if self.config.exclude.iter().any(|excluded| excluded == path) {
            log::trace!("Excluding file: {}", path.display());
            return true;
        }

        let file_name = path.file_name().map(|n| n.to_string_lossy());
        if self.config.skip_hidden && file_name.as_deref().is_some_and(|n| n.starts_with('.')) {
            log::trace!("Skipping hidden file: {}", path.display());
            return true;
        }

        if let Some(gi) = gitignore {
            let relative = path.strip_prefix(&self.root).unwrap_or(path);
            if gi.matched(relative, false).is_ignore() {
                log::trace!("Ignoring file: {}", path.display());
                return true;
            }
        }

        false
    }

    /// List the files directly inside the root directory.
    ///
    /// Subdirectories are skipped, as are symlinks unless
    /// [`WalkerConfig::follow_symlinks`] is set.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::NotFound`] or [`ScanError::NotADirectory`] for a
    /// bad root, and the first I/O error met while listing. Entries are
    /// never silently dropped on error.
    pub fn list_files(&self) -> Result<Vec<FileEntry>, ScanError> {
        let root_meta = std::fs::metadata(&self.root).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ScanError::NotFound(self.root.clone()),
            std::io::ErrorKind::PermissionDenied => ScanError::PermissionDenied(self.root.clone()),
            _ => ScanError::Io {
                path: self.root.clone(),
                source: e,
            },
        })?;
        if !root_meta.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }

        let gitignore = self.build_gitignore();
        let walk_dir = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(self.config.follow_symlinks);

        let mut files = Vec::new();
        for entry in walk_dir {
            let entry = entry.map_err(|e| self.convert_walkdir_error(e))?;
            let path = entry.path();

            if !entry.file_type().is_file() {
                // Directories, and symlinks when they are not being followed
                continue;
            }
            if self.should_skip(path, gitignore.as_ref()) {
                continue;
            }

            let metadata = entry.metadata().map_err(|e| self.convert_walkdir_error(e))?;
            let modified = metadata.modified().map_err(|source| ScanError::Io {
                path: path.to_path_buf(),
                source,
            })?;

            files.push(FileEntry::new(path.to_path_buf(), metadata.len(), modified));
        }

        log::debug!("Listed {} files in {}", files.len(), self.root.display());
        Ok(files)
    }

    /// Convert a walkdir error into a [`ScanError`].
    fn convert_walkdir_error(&self, error: walkdir::Error) -> ScanError {
        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);
        match error.into_io_error() {
            Some(source) if source.kind() == std::io::ErrorKind::PermissionDenied => {
                ScanError::PermissionDenied(path)
            }
            Some(source) if source.kind() == std::io::ErrorKind::NotFound => {
                ScanError::NotFound(path)
            }
            Some(source) => ScanError::Io { path, source },
            None => ScanError::Io {
                path,
                source: std::io::Error::new(std::io::ErrorKind::Other, "filesystem loop detected"),
            },
        }
    }
}
