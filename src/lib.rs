//! hashcheck - persisted per-file content hashes for change detection.
//!
//! A [`CacheList`](cache::CacheList) records the BLAKE3 hash and modification
//! time of every file directly inside a directory. Later runs reload the
//! list and ask which files changed; only files whose modification time
//! moved are read again.
//!
//! ```no_run
//! use hashcheck::cache::CacheList;
//! use hashcheck::scanner::Hasher;
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let dir = Path::new("/data/archive");
//! let list = CacheList::from_directory(dir, &hasher)?;
//! list.write_to(Path::new("/data/hashlist.txt"))?;
//!
//! let mut list = CacheList::from_persisted_file(dir, Path::new("/data/hashlist.txt"))?;
//! for entry in list.changed_entries(&hasher)? {
//!     println!("changed: {}", entry.name());
//! }
//! list.commit_all(&hasher)?;
//! # Ok::<(), hashcheck::cache::CacheError>(())
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod hex;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;

use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use bytesize::ByteSize;

use cache::{CacheError, CacheList, Staleness};
use cli::{CheckArgs, Cli, Commands, OutputFormat, ScanArgs, UpdateArgs};
use config::Config;
use error::ExitCode;
use output::{ChangeReport, CheckReport, TextOutput};
use progress::Progress;

/// Run the command line `cli` describes.
///
/// # Errors
///
/// Returns any failure to load, hash or write; the caller maps it to
/// [`ExitCode::GeneralError`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);
    if cli.no_color || !io::stdout().is_terminal() {
        yansi::disable();
    }

    let config = match &cli.config {
        Some(path) => Config::try_load_from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::load(),
    };

    match cli.command {
        Commands::Scan(args) => run_scan(config, &args, cli.quiet),
        Commands::Check(args) => run_check(config, &args, cli.quiet),
        Commands::Update(args) => run_update(config, &args),
    }
}

fn run_scan(mut config: Config, args: &ScanArgs, quiet: bool) -> Result<ExitCode> {
    config.merge_cache_args(&args.cache);
    config.merge_walk_args(&args.walk);

    let dir = args.cache.dir.as_path();
    let cache_path = config.cache_path(dir);
    let options = config
        .scan_options(dir)
        .with_context(|| format!("Failed to resolve {}", cache_path.display()))?;
    let hasher = config.hasher();
    let progress = Progress::new(quiet);

    let start = Instant::now();
    let list = CacheList::from_directory_with(dir, &hasher, &options, Some(&progress))
        .with_context(|| format!("Failed to scan {}", dir.display()))?;
    let elapsed = start.elapsed();

    list.write_to(&cache_path)
        .with_context(|| format!("Failed to write {}", cache_path.display()))?;

    log::info!(
        "Hashed {} files ({}) in {:.2?}",
        list.len(),
        ByteSize::b(progress.bytes_processed()),
        elapsed
    );
    log::info!("Cache written to {}", cache_path.display());
    Ok(ExitCode::Success)
}

fn run_check(mut config: Config, args: &CheckArgs, quiet: bool) -> Result<ExitCode> {
    config.merge_cache_args(&args.cache);
    config.merge_output(args.output);

    let dir = args.cache.dir.as_path();
    let cache_path = config.cache_path(dir);
    let hasher = config.hasher();
    let mut list = load_cache(dir, &cache_path)?;

    let root = list.root().to_path_buf();
    let start = Instant::now();
    let mut report = {
        let results = list
            .check_all(&hasher)
            .with_context(|| format!("Failed to check {}", dir.display()))?;
        CheckReport::new(&root, &results, start.elapsed())
    };
    log::info!(
        "Checked {} files in {:.2?}, {} changed",
        report.total,
        report.duration,
        report.changes.len()
    );

    if args.commit {
        // Deleted files cannot be committed, so they leave the cache
        for name in list.prune_missing()? {
            log::debug!("Dropped missing file {}", name);
        }
        list.commit_all(&hasher)
            .with_context(|| format!("Failed to commit {}", dir.display()))?;
        list.write_to(&cache_path)
            .with_context(|| format!("Failed to write {}", cache_path.display()))?;
        report.committed = true;
    }

    let exit_code = if report.has_changes() {
        ExitCode::ChangesDetected
    } else {
        ExitCode::Success
    };

    let mut stdout = io::stdout().lock();
    match config.output {
        OutputFormat::Json => ChangeReport::new(&report, exit_code).write_to(&mut stdout, true)?,
        OutputFormat::Text if !quiet => TextOutput::new(&report).write_to(&mut stdout)?,
        OutputFormat::Text => {}
    }
    stdout.flush()?;

    Ok(exit_code)
}

fn run_update(mut config: Config, args: &UpdateArgs) -> Result<ExitCode> {
    config.merge_cache_args(&args.cache);
    config.merge_walk_args(&args.walk);

    let dir = args.cache.dir.as_path();
    let cache_path = config.cache_path(dir);
    let hasher = config.hasher();
    let mut list = load_cache(dir, &cache_path)?;
    let start = Instant::now();

    if args.prune {
        for name in list.prune_missing()? {
            log::info!("Removed {}", name);
        }
    } else if let Some(missing) = first_missing(&mut list, &hasher)? {
        anyhow::bail!("{} no longer exists; run with --prune to drop deleted files", missing);
    }

    list.commit_all(&hasher)
        .with_context(|| format!("Failed to commit {}", dir.display()))?;

    if args.add_new {
        let walker = config
            .walker_config(dir)
            .with_context(|| format!("Failed to resolve {}", cache_path.display()))?;
        for file in list.untracked_files(&walker)? {
            let entry = list.track(&file, &hasher)?;
            log::info!("Added {}", entry.name());
        }
    }

    list.write_to(&cache_path)
        .with_context(|| format!("Failed to write {}", cache_path.display()))?;
    log::info!(
        "Updated {} entries in {:.2?}; cache written to {}",
        list.len(),
        start.elapsed(),
        cache_path.display()
    );
    Ok(ExitCode::Success)
}

fn load_cache(dir: &Path, cache_path: &Path) -> Result<CacheList> {
    CacheList::from_persisted_file(dir, cache_path).map_err(|e| match e {
        CacheError::NotFound(_) => anyhow::Error::new(e).context(format!(
            "No cache for {}; run `hashcheck scan` first",
            dir.display()
        )),
        other => anyhow::Error::new(other)
            .context(format!("Failed to load {}", cache_path.display())),
    })
}

/// Name of the first entry whose file is gone, checking every entry.
fn first_missing(list: &mut CacheList, hasher: &scanner::Hasher) -> Result<Option<String>> {
    let results = list.check_all(hasher)?;
    Ok(results
        .into_iter()
        .find(|(_, staleness)| *staleness == Staleness::Missing)
        .map(|(entry, _)| entry.name().to_string()))
}
