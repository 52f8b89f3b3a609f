//! Cooperative cancellation wired to Ctrl+C.
//!
//! Every long-running stage (validation, grouping, refinement, transfer
//! batches) takes an optional `Arc<AtomicBool>` and checks it between files.
//! [`install_handler`] connects that flag to Ctrl+C so an interrupt stops the
//! pipeline at the next file boundary instead of killing it mid-write.
//!
//! ```rust,no_run
//! use picdupe::signal::install_handler;
//!
//! let cancel = install_handler().expect("Failed to install signal handler");
//! let flag = cancel.flag();
//! // hand `flag` to ValidatorConfig, ProcessorConfig, TransferConfig...
//! if cancel.is_cancelled() {
//!     std::process::exit(130);
//! }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT (Ctrl+C) interruption: 128 + 2.
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Whether an optional cancellation flag is set.
#[must_use]
pub fn is_cancelled(flag: Option<&AtomicBool>) -> bool {
    flag.is_some_and(|f| f.load(Ordering::SeqCst))
}

/// Shared cancellation flag.
///
/// Clones share the same underlying flag.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    /// Create a flag that is not yet set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Handle to the flag for worker configuration.
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL: OnceLock<Cancellation> = OnceLock::new();

/// Install the process-wide Ctrl+C handler and return its flag.
///
/// Repeated calls return the same (reset) flag. If another handler was
/// registered outside this module, an unhooked flag is returned so library
/// users and tests can still cancel manually.
///
/// # Errors
///
/// Currently always succeeds; the `Result` leaves room for platforms where
/// a missing handler should be fatal.
pub fn install_handler() -> Result<Cancellation, SignalError> {
    if let Some(existing) = GLOBAL.get() {
        existing.reset();
        return Ok(existing.clone());
    }

    let cancellation = Cancellation::new();
    let flag = cancellation.flag();

    let installed = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "\nInterrupted. Finishing current file...");
        let _ = stderr.flush();
        log::info!("Cancellation requested");
    });

    match installed {
        Ok(()) => {
            let _ = GLOBAL.set(cancellation.clone());
            Ok(cancellation)
        }
        Err(e) => {
            log::debug!("Ctrl+C handler unavailable ({}), using unhooked flag", e);
            let fallback = GLOBAL.get_or_init(Cancellation::new);
            fallback.reset();
            Ok(fallback.clone())
        }
    }
}
