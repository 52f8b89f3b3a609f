//! File validator: bounded directory expansion and content sniffing.
//!
//! # Overview
//!
//! [`FileValidator::validate`] turns caller-supplied roots into a flat list
//! of [`ValidatedFile`]s in two passes:
//!
//! 1. **Expansion** (sequential, deterministic): each root is inspected.
//!    Files are taken as-is, directories are walked with `walkdir` down to
//!    `max_depth` levels, sorted by file name so the output order only
//!    depends on the input order and the directory contents.
//! 2. **Sniffing** (parallel): every candidate is opened and checked with
//!    [`sniff_image`]. Non-images are dropped silently.
//!
//! Any I/O failure in either pass aborts the whole call. Partial results are
//! never returned.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;
use walkdir::{DirEntry, WalkDir};

use super::{
    sniff_image, CandidatePath, FileIdentity, IdentityTracker, ValidateError, ValidatedFile,
    ValidatorConfig,
};
use crate::pool::run_in_pool;

/// Expands input paths and keeps those that are genuine images.
#[derive(Debug, Clone, Default)]
pub struct FileValidator {
    config: ValidatorConfig,
}

impl FileValidator {
    /// Create a validator with the given configuration.
    #[must_use]
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    fn is_shutdown_requested(&self) -> bool {
        crate::signal::is_cancelled(self.config.shutdown_flag.as_deref())
    }

    /// Expand roots into regular-file candidates.
    ///
    /// Files appear in root order; within a directory, in file-name order.
    /// A file reachable under several names is listed once, at its first
    /// position: paths are compared by [`FileIdentity`], not spelling.
    ///
    /// # Errors
    ///
    /// - [`ValidateError::NotFound`] if a root does not exist
    /// - [`ValidateError::PermissionDenied`] / [`ValidateError::Io`] if a
    ///   root or any directory inside the depth budget cannot be read
    /// - [`ValidateError::Interrupted`] if cancellation was requested
    pub fn expand(&self, roots: &[PathBuf]) -> Result<Vec<CandidatePath>, ValidateError> {
        let mut seen = IdentityTracker::new();
        let mut candidates = Vec::new();

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("walking", 0);
        }

        for root in roots {
            if self.is_shutdown_requested() {
                return Err(ValidateError::Interrupted);
            }

            let candidate =
                CandidatePath::inspect(root).map_err(|e| ValidateError::from_io(root, e))?;

            if !candidate.exists {
                log::error!("Input path does not exist: {}", root.display());
                return Err(ValidateError::NotFound(root.clone()));
            }

            if candidate.is_file {
                if Self::first_sighting(&mut seen, &candidate.path)? {
                    candidates.push(candidate);
                }
            } else if candidate.is_dir {
                for path in self.walk_directory(root)? {
                    if Self::first_sighting(&mut seen, &path)? {
                        candidates.push(CandidatePath::file(path));
                    }
                }
            } else {
                log::debug!("Skipping special file: {}", root.display());
            }

            if let Some(ref callback) = self.config.progress_callback {
                callback.on_progress(candidates.len(), &root.to_string_lossy());
            }
        }

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("walking");
        }

        log::debug!(
            "Expanded {} root(s) into {} candidate file(s)",
            roots.len(),
            candidates.len()
        );
        Ok(candidates)
    }

    /// Record `path`; `false` if the same file was already listed under any
    /// name (another spelling of the path, a symlink or a hardlink).
    fn first_sighting(seen: &mut IdentityTracker, path: &Path) -> Result<bool, ValidateError> {
        let identity = FileIdentity::of(path).map_err(|e| ValidateError::from_io(path, e))?;
        let first = seen.first_sighting(identity);
        if !first {
            log::debug!("Already listed under another name: {}", path.display());
        }
        Ok(first)
    }

    /// List regular files below `root` within the depth budget.
    fn walk_directory(&self, root: &Path) -> Result<Vec<PathBuf>, ValidateError> {
        let skip_hidden = self.config.skip_hidden;
        let walker = WalkDir::new(root)
            .min_depth(1)
            .max_depth(self.config.max_depth)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| !(skip_hidden && is_hidden(entry)));

        let mut files = Vec::new();
        for entry in walker {
            if self.is_shutdown_requested() {
                return Err(ValidateError::Interrupted);
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    if let Some(ancestor) = e.loop_ancestor() {
                        log::warn!(
                            "Symlink loop detected, skipping: {} -> {}",
                            e.path().map_or_else(String::new, |p| p.display().to_string()),
                            ancestor.display()
                        );
                        continue;
                    }

                    let path = e.path().unwrap_or(root).to_path_buf();
                    let message = e.to_string();
                    log::error!("Cannot read {}: {}", path.display(), message);
                    return Err(match e.into_io_error() {
                        Some(io) => ValidateError::from_io(&path, io),
                        None => ValidateError::Walk { path, message },
                    });
                }
            };

            let file_type = entry.file_type();
            if file_type.is_file() {
                files.push(entry.into_path());
            } else if file_type.is_symlink() {
                log::trace!("Not following symlink: {}", entry.path().display());
            }
        }

        Ok(files)
    }

    /// Validate input paths into a flat list of images.
    ///
    /// An empty result is a successful outcome: it means no candidate passed
    /// the image predicate.
    ///
    /// # Errors
    ///
    /// Fails as [`expand`](Self::expand) does, and additionally if any
    /// candidate file cannot be opened or read while sniffing.
    pub fn validate(&self, roots: &[PathBuf]) -> Result<Vec<ValidatedFile>, ValidateError> {
        let candidates = self.expand(roots)?;
        self.validate_candidates(candidates)
    }

    /// Sniff already-expanded candidates, preserving their order.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error encountered, or `Interrupted`.
    pub fn validate_candidates(
        &self,
        candidates: Vec<CandidatePath>,
    ) -> Result<Vec<ValidatedFile>, ValidateError> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let total = candidates.len();
        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_start("validating", total);
        }
        log::info!("Validating {} candidate file(s)", total);

        let processed = AtomicUsize::new(0);
        let results: Result<Vec<Option<ValidatedFile>>, ValidateError> =
            run_in_pool(self.config.io_threads, || {
                candidates
                    .into_par_iter()
                    .map(|candidate| {
                        if self.is_shutdown_requested() {
                            return Err(ValidateError::Interrupted);
                        }

                        let info = sniff_image(&candidate.path)
                            .map_err(|e| ValidateError::from_io(&candidate.path, e))?;

                        if let Some(ref callback) = self.config.progress_callback {
                            let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                            callback.on_progress(current, &candidate.path.to_string_lossy());
                        }

                        match info {
                            Some(info) => Ok(Some(ValidatedFile::new(candidate.path, info))),
                            None => {
                                log::trace!("Not an image: {}", candidate.path.display());
                                Ok(None)
                            }
                        }
                    })
                    .collect()
            });

        if let Some(ref callback) = self.config.progress_callback {
            callback.on_phase_end("validating");
        }

        let files: Vec<ValidatedFile> = results?.into_iter().flatten().collect();
        log::info!(
            "Validation complete: {} of {} candidate(s) are images",
            files.len(),
            total
        );
        Ok(files)
    }
}

/// Dot-prefixed names below the walk root.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}
