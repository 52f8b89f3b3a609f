//! Progress reporting.
//!
//! Pipeline stages report through [`ProgressCallback`]; the binary plugs in
//! [`Progress`], which drives one indicatif bar per phase. Phase names used by
//! the library: `walking`, `validating`, `grouping`, `refining`, `moving`,
//! `deleting`.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receives progress updates from the pipeline.
///
/// Implementations must be cheap: `on_progress` is called from worker
/// threads once per file.
pub trait ProgressCallback: Send + Sync {
    /// A phase begins with `total` items (0 when unknown).
    fn on_phase_start(&self, phase: &str, total: usize);

    /// `current` items (1-based) are done; `path` is the latest.
    fn on_progress(&self, current: usize, path: &str);

    /// An item of `bytes` size was handled successfully.
    fn on_item_completed(&self, _bytes: u64) {}

    /// The phase finished.
    fn on_phase_end(&self, phase: &str);

    /// Free-form status text.
    fn on_message(&self, _message: &str) {}
}

/// indicatif-backed progress reporter.
pub struct Progress {
    active: Mutex<Option<ProgressBar>>,
    quiet: bool,
}

impl Progress {
    /// Create a reporter. A quiet reporter draws nothing.
    ///
    /// ```
    /// use picdupe::progress::Progress;
    ///
    /// let progress = Progress::new(true);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            active: Mutex::new(None),
            quiet,
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn with_active(&self, f: impl FnOnce(&ProgressBar)) {
        if let Ok(guard) = self.active.lock() {
            if let Some(ref bar) = *guard {
                f(bar);
            }
        }
    }
}

fn phase_label(phase: &str) -> &str {
    match phase {
        "walking" => "Expanding paths",
        "validating" => "Checking images",
        "grouping" => "Computing signatures",
        "refining" => "Comparing images",
        "moving" => "Moving duplicates",
        "deleting" => "Deleting duplicates",
        other => other,
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let bar = if total == 0 {
            let bar = ProgressBar::new_spinner();
            bar.set_style(Self::spinner_style());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        } else {
            let bar = ProgressBar::with_draw_target(
                Some(total as u64),
                ProgressDrawTarget::stderr(),
            );
            bar.set_style(Self::bar_style());
            bar
        };
        bar.set_message(phase_label(phase).to_string());

        if let Ok(mut guard) = self.active.lock() {
            if let Some(previous) = guard.replace(bar) {
                previous.finish_and_clear();
            }
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }
        self.with_active(|bar| {
            bar.set_position(current as u64);
            bar.set_message(truncate_path(path, 30));
        });
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }
        if let Ok(mut guard) = self.active.lock() {
            if let Some(bar) = guard.take() {
                bar.finish_with_message(format!("{} complete", phase_label(phase)));
            }
        }
    }

    fn on_message(&self, message: &str) {
        if self.quiet {
            return;
        }
        self.with_active(|bar| bar.set_message(message.to_string()));
    }
}

/// Shorten a path to its file name when it exceeds `max_len` characters.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let count = file_name.chars().count();
    if count + 4 > max_len {
        let keep = max_len.saturating_sub(3);
        let tail: String = file_name.chars().skip(count.saturating_sub(keep)).collect();
        return format!("...{tail}");
    }
    format!(".../{file_name}")
}
