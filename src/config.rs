//! Layered application configuration.
//!
//! Settings are merged with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. `config.toml` in the platform config directory, or the file given
//!    with `--config`
//! 3. `HASHCHECK_*` environment variables (e.g. `HASHCHECK_IO_THREADS=4`)
//! 4. Command-line flags
//!
//! ```toml
//! cache_file = ".hashes"
//! io_threads = 1
//! skip_hidden = true
//! ignore_patterns = ["*.tmp", "Thumbs.db"]
//! ```

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cache::ScanOptions;
use crate::cli::{CacheArgs, OutputFormat, WalkArgs};
use crate::scanner::{Hasher, WalkerConfig, DEFAULT_BUFFER_SIZE};

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "HASHCHECK_";

/// Default cache file name, relative to the tracked directory.
pub const DEFAULT_CACHE_FILE: &str = "hashlist.txt";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cache file; relative paths are resolved against the tracked directory.
    pub cache_file: PathBuf,
    /// Hashing threads used when building a cache.
    pub io_threads: usize,
    /// Read buffer size in bytes.
    pub buffer_size: usize,
    /// Skip files whose names start with a dot.
    pub skip_hidden: bool,
    /// Follow symbolic links to files.
    pub follow_symlinks: bool,
    /// Gitignore-style patterns of files to leave out.
    pub ignore_patterns: Vec<String>,
    /// Report format of `check`.
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_file: PathBuf::from(DEFAULT_CACHE_FILE),
            io_threads: 1,
            buffer_size: DEFAULT_BUFFER_SIZE,
            skip_hidden: false,
            follow_symlinks: false,
            ignore_patterns: Vec::new(),
            output: OutputFormat::Text,
        }
    }
}

impl Config {
    /// Load from the default platform-specific location.
    ///
    /// Falls back to defaults plus environment when no config directory can
    /// be determined.
    #[must_use]
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from_path(path),
            None => Self::load_from_figment(Self::base_figment()),
        }
    }

    /// Load from a specific TOML file. A missing file is not an error.
    ///
    /// Invalid settings are logged and replaced by the defaults.
    #[must_use]
    pub fn load_from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        log::debug!("Loading configuration from {}", path.display());
        Self::load_from_figment(Self::base_figment().merge(Toml::file(path)))
    }

    /// Like [`load_from_path`](Self::load_from_path) but reports bad settings.
    ///
    /// # Errors
    ///
    /// Returns the figment error for unparsable TOML or mistyped values.
    pub fn try_load_from_path(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::base_figment()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(Box::new)
    }

    fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
    }

    fn load_from_figment(figment: Figment) -> Self {
        match figment.merge(Env::prefixed(ENV_PREFIX)).extract() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Invalid configuration, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// The default platform-specific configuration file.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "hashcheck").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply `--cache`.
    pub fn merge_cache_args(&mut self, args: &CacheArgs) {
        if let Some(cache) = &args.cache {
            self.cache_file = cache.clone();
        }
    }

    /// Apply the listing and threading flags. Flags add to, and never
    /// clear, settings from lower layers.
    pub fn merge_walk_args(&mut self, args: &WalkArgs) {
        self.skip_hidden |= args.skip_hidden;
        self.follow_symlinks |= args.follow_symlinks;
        self.ignore_patterns
            .extend(args.ignore_patterns.iter().cloned());
        if let Some(threads) = args.io_threads {
            self.io_threads = usize::from(threads);
        }
    }

    /// Apply `--output`.
    pub fn merge_output(&mut self, output: Option<OutputFormat>) {
        if let Some(output) = output {
            self.output = output;
        }
    }

    /// Where the cache file of `dir` lives.
    #[must_use]
    pub fn cache_path(&self, dir: &Path) -> PathBuf {
        if self.cache_file.is_absolute() {
            self.cache_file.clone()
        } else {
            dir.join(&self.cache_file)
        }
    }

    /// Listing options for `dir`, always leaving out its cache file.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the cache path cannot be made absolute.
    pub fn walker_config(&self, dir: &Path) -> std::io::Result<WalkerConfig> {
        let cache = std::path::absolute(self.cache_path(dir))?;
        Ok(WalkerConfig::new(
            self.follow_symlinks,
            self.skip_hidden,
            self.ignore_patterns.clone(),
        )
        .excluding(cache))
    }

    /// Scan options for building the cache of `dir`.
    ///
    /// # Errors
    ///
    /// See [`walker_config`](Self::walker_config).
    pub fn scan_options(&self, dir: &Path) -> std::io::Result<ScanOptions> {
        Ok(ScanOptions {
            walker: self.walker_config(dir)?,
            io_threads: self.io_threads,
        })
    }

    /// The file hasher these settings describe.
    #[must_use]
    pub fn hasher(&self) -> Hasher {
        Hasher::with_buffer_size(self.buffer_size)
    }
}
