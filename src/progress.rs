//! Progress reporting for long hashing runs.
//!
//! Library code reports through the [`ProgressCallback`] trait; the CLI
//! plugs in [`Progress`], which draws an indicatif bar on stderr.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bytesize::ByteSize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receiver for progress updates.
///
/// Callbacks may arrive from several hashing threads at once.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase (e.g., "hashing")
    /// * `total` - Total number of items to process
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Number of items done so far (1-based)
    /// * `path` - Name of the item just finished
    fn on_progress(&self, current: usize, path: &str);

    /// Called with the size of each finished item.
    fn on_item_completed(&self, _bytes: u64) {}

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);
}

/// Terminal progress bar for hashing.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    bytes: AtomicU64,
    quiet: bool,
}

impl Progress {
    /// Create a progress reporter. A quiet reporter draws nothing.
    ///
    /// ```
    /// use hashcheck::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// assert_eq!(progress.bytes_processed(), 0);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            bytes: AtomicU64::new(0),
            quiet,
        }
    }

    /// Bytes reported through [`ProgressCallback::on_item_completed`].
    #[must_use]
    pub fn bytes_processed(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.bar.lock() {
            if let Some(bar) = guard.as_ref() {
                f(bar);
            }
        }
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
        bar.set_style(Self::style());
        bar.set_message(phase.to_string());
        if let Ok(mut guard) = self.bar.lock() {
            *guard = Some(bar);
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        self.with_bar(|bar| {
            bar.set_position(current as u64);
            bar.set_message(truncate_name(path, 30));
        });
    }

    fn on_item_completed(&self, bytes: u64) {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    fn on_phase_end(&self, phase: &str) {
        let bar = self.bar.lock().ok().and_then(|mut guard| guard.take());
        if let Some(bar) = bar {
            bar.finish_and_clear();
            log::debug!(
                "{} finished: {} items, {}",
                phase,
                bar.position(),
                ByteSize::b(self.bytes_processed())
            );
        }
    }
}

/// Shorten a name to at most `max_len` characters, keeping its end.
fn truncate_name(name: &str, max_len: usize) -> String {
    let len = name.chars().count();
    if len <= max_len {
        return name.to_string();
    }
    let tail: String = name.chars().skip(len - max_len + 3).collect();
    format!("...{}", tail)
}
