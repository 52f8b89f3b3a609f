//! Deleting duplicates, permanently or via the system trash.
//!
//! # Example
//!
//! ```no_run
//! use picdupe::actions::{delete_batch, TransferConfig};
//! use std::path::PathBuf;
//!
//! let files = vec![PathBuf::from("/photos/dup1.jpg")];
//! let result = delete_batch(&files, &TransferConfig::default().with_permanent(false));
//! println!("{}", result.summary());
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use super::transfer::{TransferConfig, TransferError, TransferKind, TransferRecord, TransferResult};
use crate::pool::run_in_pool;

fn file_size(path: &Path) -> Result<u64, TransferError> {
    let metadata = fs::metadata(path).map_err(|e| TransferError::from_io(path, e))?;
    if metadata.is_file() {
        Ok(metadata.len())
    } else {
        Err(TransferError::DeleteFailed {
            path: path.to_path_buf(),
            message: "not a regular file".to_string(),
        })
    }
}

/// Move a single file to the system trash.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if it cannot be accessed
/// - `TrashFailed` if the trash operation fails
pub fn delete_to_trash(path: &Path) -> Result<TransferRecord, TransferError> {
    let size = file_size(path)?;

    trash::delete(path).map_err(|e| {
        log::error!("Trash operation failed for {}: {}", path.display(), e);
        TransferError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Moved to trash: {} ({} bytes)", path.display(), size);
    Ok(TransferRecord {
        source: path.to_path_buf(),
        destination: None,
        size,
    })
}

/// Permanently delete a single file.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if it cannot be accessed
/// - `DeleteFailed` if removal fails
pub fn permanent_delete(path: &Path) -> Result<TransferRecord, TransferError> {
    let size = file_size(path)?;

    fs::remove_file(path).map_err(|e| {
        log::error!("Permanent delete failed for {}: {}", path.display(), e);
        TransferError::DeleteFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Permanently deleted: {} ({} bytes)", path.display(), size);
    Ok(TransferRecord {
        source: path.to_path_buf(),
        destination: None,
        size,
    })
}

/// Delete a single file according to `permanent`.
///
/// # Errors
///
/// See [`permanent_delete`] and [`delete_to_trash`].
pub fn delete_file(path: &Path, permanent: bool) -> Result<TransferRecord, TransferError> {
    if permanent {
        permanent_delete(path)
    } else {
        delete_to_trash(path)
    }
}

/// Delete every file, isolating per-file failures.
///
/// Files are processed in parallel; the result lists them in input order.
#[must_use]
pub fn delete_batch(files: &[PathBuf], config: &TransferConfig) -> TransferResult {
    let kind = if config.permanent {
        TransferKind::Delete
    } else {
        TransferKind::Trash
    };
    let mut result = TransferResult::new(kind);
    if files.is_empty() {
        return result;
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start("deleting", files.len());
    }
    log::info!(
        "Deleting {} file(s) ({})",
        files.len(),
        if config.permanent { "permanent" } else { "trash" }
    );

    let processed = AtomicUsize::new(0);
    let outcomes: Vec<Result<TransferRecord, TransferError>> =
        run_in_pool(config.io_threads, || {
            files
                .par_iter()
                .map(|path| {
                    let outcome = if config.is_shutdown_requested() {
                        Err(TransferError::Interrupted(path.clone()))
                    } else {
                        delete_file(path, config.permanent)
                    };

                    if let Some(ref callback) = config.progress_callback {
                        let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                        callback.on_progress(current, &path.to_string_lossy());
                    }
                    outcome
                })
                .collect()
        });

    for (path, outcome) in files.iter().zip(outcomes) {
        result.record(path.clone(), outcome);
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end("deleting");
    }
    log::info!("{}", result.summary());

    result
}
