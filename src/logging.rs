//! Logging setup for hashcheck.
//!
//! Logs go to stderr through the `log` facade and the `env_logger` backend,
//! leaving stdout to command results. The level is chosen, first match
//! wins, from:
//!
//! 1. The `HASHCHECK_LOG` environment variable, in `env_logger` filter
//!    syntax (e.g. `hashcheck::cache=trace`)
//! 2. `--quiet` (errors only) or `-v`/`-vv` (debug/trace)
//! 3. Info
//!
//! ```rust,no_run
//! use hashcheck::logging::init_logging;
//!
//! init_logging(1, false);
//! log::debug!("visible with -v");
//! ```

use std::env;
use std::io::Write;

use env_logger::Builder;
use log::LevelFilter;

/// Environment variable holding a log filter that overrides the CLI flags.
pub const LOG_ENV_VAR: &str = "HASHCHECK_LOG";

/// Install the global logger.
///
/// Calling this more than once is harmless; later calls leave the first
/// logger in place and return `false`.
///
/// # Arguments
///
/// * `verbose` - Verbosity count from CLI (0=info, 1=debug, 2+=trace)
/// * `quiet` - Only show errors (ignored when `HASHCHECK_LOG` is set)
pub fn init_logging(verbose: u8, quiet: bool) -> bool {
    let mut builder = Builder::new();
    let filter = env::var(LOG_ENV_VAR).ok().filter(|f| !f.trim().is_empty());

    match &filter {
        Some(filter) => {
            builder.parse_filters(filter);
        }
        None => {
            builder.filter_level(determine_level(verbose, quiet));
        }
    }

    builder.format(move |buf, record| {
        let level = record.level();
        let style = buf.default_level_style(level);
        if verbose > 0 {
            writeln!(
                buf,
                "{} {style}{:<5}{style:#} [{}] {}",
                buf.timestamp_millis(),
                level,
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        } else {
            writeln!(buf, "{style}{:<5}{style:#} {}", level, record.args())
        }
    });

    let installed = builder.try_init().is_ok();
    if installed {
        match filter {
            Some(filter) => log::debug!("Logging initialized from {}={}", LOG_ENV_VAR, filter),
            None => log::debug!("Logging initialized at level {}", log::max_level()),
        }
    }
    installed
}

/// Map the CLI flags to a level filter. Quiet wins over verbose.
fn determine_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
