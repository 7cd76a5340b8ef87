//! Command-line interface definitions for hashcheck.
//!
//! ```bash
//! # Hash every file in a directory and write hashlist.txt next to them
//! hashcheck scan ~/archive
//!
//! # Report files that changed since the last scan
//! hashcheck check ~/archive --output json
//!
//! # Accept the current state, dropping deleted files and adding new ones
//! hashcheck update ~/archive --prune --add-new
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

/// Detect changed files with a persisted content-hash cache.
///
/// hashcheck records a BLAKE3 hash and modification time for every file in a
/// directory, then reports which files changed, rehashing only those whose
/// modification time moved.
#[derive(Debug, Parser)]
#[command(name = "hashcheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Hash every file in a directory and write a fresh cache
    Scan(ScanArgs),
    /// Report cached files that changed or went missing
    Check(CheckArgs),
    /// Bring the cache up to date with the directory
    Update(UpdateArgs),
}

/// Directory and cache file shared by every subcommand.
#[derive(Debug, Args)]
pub struct CacheArgs {
    /// Directory whose files are tracked
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Cache file (relative paths are resolved against DIR)
    ///
    /// Defaults to `hashlist.txt`.
    #[arg(long, value_name = "FILE")]
    pub cache: Option<PathBuf>,
}

/// Options controlling which files are listed and how they are hashed.
#[derive(Debug, Args, Default)]
pub struct WalkArgs {
    /// Glob patterns to ignore (can be specified multiple times)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Follow symbolic links to files
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,

    /// Number of hashing threads
    ///
    /// One thread is usually fastest on a single spinning disk.
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub io_threads: Option<u16>,
}

/// Arguments for the scan subcommand.
#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub cache: CacheArgs,

    #[command(flatten)]
    pub walk: WalkArgs,
}

/// Arguments for the check subcommand.
#[derive(Debug, Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub cache: CacheArgs,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Commit the changes and rewrite the cache after reporting them
    #[arg(long)]
    pub commit: bool,
}

/// Arguments for the update subcommand.
#[derive(Debug, Args)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub cache: CacheArgs,

    #[command(flatten)]
    pub walk: WalkArgs,

    /// Drop entries whose files were deleted
    #[arg(long)]
    pub prune: bool,

    /// Hash and add files that have no entry yet
    #[arg(long)]
    pub add_new: bool,
}

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
