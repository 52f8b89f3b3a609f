//! Shared types for bulk file transfers (move and delete).
//!
//! A batch never stops at the first failed file: each file's fate is
//! recorded independently and the caller gets a [`TransferResult`] with
//! successes and `(path, cause)` failures. Only conditions that invalidate
//! the whole batch, such as a bad destination directory, are returned as a
//! plain `Err` before any file is touched.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use bytesize::ByteSize;
use serde::Serialize;
use thiserror::Error;

use crate::duplicates::DuplicateMap;
use crate::progress::ProgressCallback;
use crate::scanner::{FileIdentity, IdentityTracker};

/// Error type for transfer operations.
#[derive(Debug, Error)]
pub enum TransferError {
    /// Destination is missing or not a directory. Fatal for the batch.
    #[error("invalid destination directory: {0}")]
    InvalidDestination(PathBuf),

    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when accessing the file.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Moving the file failed.
    #[error("move failed for {path}: {message}")]
    MoveFailed { path: PathBuf, message: String },

    /// Permanent delete failed.
    #[error("delete failed for {path}: {message}")]
    DeleteFailed { path: PathBuf, message: String },

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// The batch was cancelled before this file was processed.
    #[error("interrupted before processing {0}")]
    Interrupted(PathBuf),

    /// The selection contains a kept representative.
    #[error("refusing to touch kept original: {0}")]
    OriginalSelected(PathBuf),

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl TransferError {
    /// Classify an I/O error for a path.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::InvalidDestination(p)
            | Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Interrupted(p)
            | Self::OriginalSelected(p)
            | Self::MoveFailed { path: p, .. }
            | Self::DeleteFailed { path: p, .. }
            | Self::TrashFailed { path: p, .. }
            | Self::Io { path: p, .. } => p,
        }
    }
}

/// Kind of transfer performed by a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    /// Relocate into a destination directory
    Move,
    /// Permanently delete
    Delete,
    /// Send to the system trash
    Trash,
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move => write!(f, "Moved"),
            Self::Delete => write!(f, "Deleted"),
            Self::Trash => write!(f, "Trashed"),
        }
    }
}

/// A file that was transferred successfully.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRecord {
    /// Original location
    pub source: PathBuf,
    /// New location (moves only)
    pub destination: Option<PathBuf>,
    /// Size in bytes
    pub size: u64,
}

/// A file that could not be transferred.
#[derive(Debug)]
pub struct TransferFailure {
    /// The file
    pub path: PathBuf,
    /// Why it failed
    pub error: TransferError,
}

impl TransferFailure {
    /// Human-readable cause.
    #[must_use]
    pub fn cause(&self) -> String {
        self.error.to_string()
    }
}

/// Per-file outcome of a transfer batch.
#[derive(Debug)]
pub struct TransferResult {
    /// What the batch did
    pub kind: TransferKind,
    /// Successful files, in input order
    pub successes: Vec<TransferRecord>,
    /// Failed files, in input order
    pub failures: Vec<TransferFailure>,
    /// Total bytes moved or removed
    pub bytes_transferred: u64,
}

impl TransferResult {
    /// Empty result for a batch of the given kind.
    #[must_use]
    pub fn new(kind: TransferKind) -> Self {
        Self {
            kind,
            successes: Vec::new(),
            failures: Vec::new(),
            bytes_transferred: 0,
        }
    }

    pub(crate) fn record(&mut self, path: PathBuf, outcome: Result<TransferRecord, TransferError>) {
        match outcome {
            Ok(record) => {
                self.bytes_transferred += record.size;
                self.successes.push(record);
            }
            Err(error) => {
                log::warn!("{}", error);
                self.failures.push(TransferFailure { path, error });
            }
        }
    }

    /// Number of successful transfers.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed transfers.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Total number of attempted transfers.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Check if every file succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Check if the batch was cut short by cancellation.
    #[must_use]
    pub fn was_interrupted(&self) -> bool {
        self.failures
            .iter()
            .any(|f| matches!(f.error, TransferError::Interrupted(_)))
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let size = ByteSize::b(self.bytes_transferred);
        if self.all_succeeded() {
            format!("{} {} file(s) ({})", self.kind, self.success_count(), size)
        } else {
            format!(
                "{} {} file(s) ({}), {} failed",
                self.kind,
                self.success_count(),
                size,
                self.failure_count()
            )
        }
    }
}

/// Configuration for transfer batches.
#[derive(Clone)]
pub struct TransferConfig {
    /// Worker threads for per-file operations.
    pub io_threads: usize,
    /// Delete permanently instead of sending to trash.
    pub permanent: bool,
    /// Optional cancellation flag, checked before each file.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl fmt::Debug for TransferConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferConfig")
            .field("io_threads", &self.io_threads)
            .field("permanent", &self.permanent)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            permanent: true,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl TransferConfig {
    /// Set the number of worker threads.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Choose permanent deletion (`true`) or trash (`false`).
    #[must_use]
    pub fn with_permanent(mut self, permanent: bool) -> Self {
        self.permanent = permanent;
        self
    }

    /// Set the cancellation flag.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub(crate) fn is_shutdown_requested(&self) -> bool {
        crate::signal::is_cancelled(self.shutdown_flag.as_deref())
    }
}

/// Check that a selection leaves every kept representative alone.
///
/// Paths are compared by [`FileIdentity`], so a kept file selected under
/// another name (a different spelling, a symlink or a hardlink) is caught.
///
/// # Errors
///
/// Returns [`TransferError::OriginalSelected`] for the first selected path
/// that names a key of `map`.
pub fn validate_preserves_originals(
    selected: &[PathBuf],
    map: &DuplicateMap,
) -> Result<(), TransferError> {
    let mut kept = IdentityTracker::new();
    for original in map.originals() {
        kept.first_sighting(FileIdentity::resolve(original));
    }

    match selected
        .iter()
        .find(|p| map.contains_original(p) || kept.contains(&FileIdentity::resolve(p)))
    {
        Some(path) => {
            log::error!("Selection includes a kept file: {}", path.display());
            Err(TransferError::OriginalSelected(path.clone()))
        }
        None => Ok(()),
    }
}
