//! Moving duplicates into a destination directory.
//!
//! # Collisions
//!
//! A file keeps its name in the destination. If a file of that name is
//! already there it is overwritten. When several files in one batch share a
//! name they are moved one after another in input order, so the last one
//! wins and the outcome does not depend on thread scheduling.
//!
//! # Example
//!
//! ```no_run
//! use picdupe::actions::{move_batch, TransferConfig};
//! use std::path::{Path, PathBuf};
//!
//! let files = vec![PathBuf::from("/photos/dup1.jpg"), PathBuf::from("/photos/dup2.jpg")];
//! match move_batch(&files, Path::new("/photos/duplicates"), &TransferConfig::default()) {
//!     Ok(result) => println!("{}", result.summary()),
//!     Err(e) => eprintln!("Nothing moved: {}", e),
//! }
//! ```

use std::collections::HashMap;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use super::transfer::{TransferConfig, TransferError, TransferKind, TransferRecord, TransferResult};
use crate::pool::run_in_pool;

/// Check that `destination` exists and is a directory.
///
/// # Errors
///
/// Returns [`TransferError::InvalidDestination`] otherwise.
pub fn check_destination(destination: &Path) -> Result<(), TransferError> {
    match fs::metadata(destination) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => {
            log::error!("Destination is not a directory: {}", destination.display());
            Err(TransferError::InvalidDestination(destination.to_path_buf()))
        }
        Err(e) => {
            log::error!(
                "Destination is not accessible: {} ({})",
                destination.display(),
                e
            );
            Err(TransferError::InvalidDestination(destination.to_path_buf()))
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Move a single file into `destination`, overwriting a same-named file.
///
/// Falls back to copy and remove when the destination is on another
/// filesystem.
///
/// # Errors
///
/// - `NotFound` / `PermissionDenied` if the source cannot be accessed
/// - `MoveFailed` if the rename (or the copy fallback) fails
pub fn move_file(source: &Path, destination: &Path) -> Result<TransferRecord, TransferError> {
    let metadata = fs::metadata(source).map_err(|e| TransferError::from_io(source, e))?;
    if !metadata.is_file() {
        return Err(TransferError::MoveFailed {
            path: source.to_path_buf(),
            message: "not a regular file".to_string(),
        });
    }
    let size = metadata.len();

    let Some(name) = source.file_name() else {
        return Err(TransferError::MoveFailed {
            path: source.to_path_buf(),
            message: "path has no file name".to_string(),
        });
    };
    let target = destination.join(name);

    if same_file(source, &target) {
        log::debug!("Already in destination: {}", source.display());
        return Ok(TransferRecord {
            source: source.to_path_buf(),
            destination: Some(target),
            size,
        });
    }

    if let Err(e) = fs::rename(source, &target) {
        if e.kind() != io::ErrorKind::CrossesDevices {
            return Err(match e.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    TransferError::from_io(source, e)
                }
                _ => TransferError::MoveFailed {
                    path: source.to_path_buf(),
                    message: e.to_string(),
                },
            });
        }
        copy_then_remove(source, &target)?;
    }

    log::info!("Moved: {} -> {}", source.display(), target.display());
    Ok(TransferRecord {
        source: source.to_path_buf(),
        destination: Some(target),
        size,
    })
}

fn copy_then_remove(source: &Path, target: &Path) -> Result<(), TransferError> {
    log::debug!(
        "Cross-device move, copying {} -> {}",
        source.display(),
        target.display()
    );
    fs::copy(source, target).map_err(|e| TransferError::MoveFailed {
        path: source.to_path_buf(),
        message: format!("copy to {} failed: {}", target.display(), e),
    })?;

    if let Err(e) = fs::remove_file(source) {
        // Leave exactly one copy behind
        if let Err(cleanup) = fs::remove_file(target) {
            log::error!(
                "Could not remove partial copy {}: {}",
                target.display(),
                cleanup
            );
        }
        return Err(TransferError::MoveFailed {
            path: source.to_path_buf(),
            message: format!("source could not be removed after copy: {e}"),
        });
    }
    Ok(())
}

/// Move every file into `destination`, isolating per-file failures.
///
/// Files with distinct names are moved in parallel.
///
/// # Errors
///
/// Returns [`TransferError::InvalidDestination`] before touching any file
/// if `destination` is not an existing directory. Every other failure is
/// recorded in the returned [`TransferResult`].
pub fn move_batch(
    files: &[PathBuf],
    destination: &Path,
    config: &TransferConfig,
) -> Result<TransferResult, TransferError> {
    check_destination(destination)?;

    let mut result = TransferResult::new(TransferKind::Move);
    if files.is_empty() {
        return Ok(result);
    }

    // Same-name files form one sequential lane, in input order
    let mut lanes: Vec<Vec<usize>> = Vec::new();
    let mut lane_of: HashMap<Option<OsString>, usize> = HashMap::new();
    for (index, path) in files.iter().enumerate() {
        let key = path.file_name().map(|n| n.to_os_string());
        let lane = *lane_of.entry(key).or_insert_with(|| {
            lanes.push(Vec::new());
            lanes.len() - 1
        });
        lanes[lane].push(index);
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_start("moving", files.len());
    }
    log::info!(
        "Moving {} file(s) to {}",
        files.len(),
        destination.display()
    );

    let processed = AtomicUsize::new(0);
    let mut outcomes: Vec<(usize, Result<TransferRecord, TransferError>)> =
        run_in_pool(config.io_threads, || {
            lanes
                .par_iter()
                .flat_map_iter(|lane| {
                    lane.iter()
                        .map(|&index| {
                            let path = &files[index];
                            let outcome = if config.is_shutdown_requested() {
                                Err(TransferError::Interrupted(path.clone()))
                            } else {
                                move_file(path, destination)
                            };

                            if let Some(ref callback) = config.progress_callback {
                                let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                                callback.on_progress(current, &path.to_string_lossy());
                                if let Ok(ref record) = outcome {
                                    callback.on_item_completed(record.size);
                                }
                            }
                            (index, outcome)
                        })
                        .collect::<Vec<_>>()
                })
                .collect()
        });

    outcomes.sort_by_key(|(index, _)| *index);
    for (index, outcome) in outcomes {
        result.record(files[index].clone(), outcome);
    }

    if let Some(ref callback) = config.progress_callback {
        callback.on_phase_end("moving");
    }
    log::info!("{}", result.summary());

    Ok(result)
}
