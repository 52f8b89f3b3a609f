//! The pipeline facade.
//!
//! [`Comparer`] is built once from a [`Config`] and exposes the four
//! independent operations: [`validate`](Comparer::validate),
//! [`compare`](Comparer::compare), [`move_duplicates`](Comparer::move_duplicates)
//! and [`delete_duplicates`](Comparer::delete_duplicates). Each operation
//! builds the component it needs from the configuration, so a `Comparer`
//! holds no state between calls.
//!
//! # Example
//!
//! ```no_run
//! use picdupe::comparer::Comparer;
//! use picdupe::config::Config;
//! use std::path::{Path, PathBuf};
//!
//! let comparer = Comparer::new(&Config::default());
//! let files = comparer.validate(&[PathBuf::from("./photos")])?;
//! let (map, summary) = comparer.compare(&files)?;
//! println!("{} duplicate(s)", summary.duplicate_files);
//!
//! let moved = comparer.move_duplicates(&map.flatten(), Some(Path::new("./dupes")))?;
//! println!("{}", moved.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::actions::{
    delete_batch, move_batch, TransferConfig, TransferError, TransferKind, TransferResult,
};
use crate::config::Config;
use crate::duplicates::{
    Algorithm, CompareSummary, DuplicateMap, DuplicateProcessor, PerceptualStage, PixelExactStage,
    ProcessorConfig, ProcessorError,
};
use crate::progress::ProgressCallback;
use crate::scanner::{FileValidator, ValidateError, ValidatedFile, ValidatorConfig};

/// Entry point for the dedup pipeline.
#[derive(Clone)]
pub struct Comparer {
    config: Config,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl fmt::Debug for Comparer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparer")
            .field("config", &self.config)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Comparer {
    /// Create a comparer from a configuration snapshot.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.clone(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Share a cancellation flag with every stage.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Report progress to `callback`.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// The configuration this comparer was built from.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The refinement stages enabled by the configuration, in run order.
    #[must_use]
    pub fn build_algorithms(&self) -> Vec<Box<dyn Algorithm>> {
        let mut algorithms: Vec<Box<dyn Algorithm>> = Vec::new();
        if self.config.perceptual_hash {
            algorithms.push(Box::new(
                PerceptualStage::new(self.config.perceptual_algorithm)
                    .with_hash_size(self.config.hash_size)
                    .with_threshold(self.config.similarity_threshold),
            ));
        }
        if self.config.pixel_by_pixel {
            algorithms.push(Box::new(PixelExactStage::new()));
        }
        algorithms
    }

    fn validator(&self) -> FileValidator {
        let mut config = ValidatorConfig::default()
            .with_max_depth(self.config.effective_depth())
            .with_follow_symlinks(self.config.follow_symlinks)
            .with_skip_hidden(self.config.skip_hidden)
            .with_io_threads(self.config.io_threads);
        if let Some(ref flag) = self.shutdown_flag {
            config = config.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.progress_callback {
            config = config.with_progress_callback(Arc::clone(callback));
        }
        FileValidator::new(config)
    }

    fn processor(&self) -> DuplicateProcessor {
        let mut config = ProcessorConfig::default()
            .with_io_threads(self.config.io_threads)
            .with_signature(self.config.signature);
        if let Some(ref flag) = self.shutdown_flag {
            config = config.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.progress_callback {
            config = config.with_progress_callback(Arc::clone(callback));
        }
        DuplicateProcessor::new(config, self.build_algorithms())
    }

    fn transfer_config(&self) -> TransferConfig {
        let mut config = TransferConfig::default()
            .with_io_threads(self.config.io_threads)
            .with_permanent(self.config.permanent_delete);
        if let Some(ref flag) = self.shutdown_flag {
            config = config.with_shutdown_flag(Arc::clone(flag));
        }
        if let Some(ref callback) = self.progress_callback {
            config = config.with_progress_callback(Arc::clone(callback));
        }
        config
    }

    /// Expand `roots` and keep the files that are genuine images.
    ///
    /// # Errors
    ///
    /// Any unreadable root, directory or file fails the whole call.
    pub fn validate(&self, roots: &[PathBuf]) -> Result<Vec<ValidatedFile>, ValidateError> {
        if roots.is_empty() {
            log::warn!("No files to validate");
            return Ok(Vec::new());
        }
        self.validator().validate(roots)
    }

    /// Classify validated files into a duplicate map.
    ///
    /// # Errors
    ///
    /// See [`DuplicateProcessor::compare`].
    pub fn compare(
        &self,
        files: &[ValidatedFile],
    ) -> Result<(DuplicateMap, CompareSummary), ProcessorError> {
        if files.is_empty() {
            log::warn!("No files to compare");
            return Ok((DuplicateMap::new(), CompareSummary::default()));
        }
        self.processor().compare(files)
    }

    /// Move `files` into `destination`, or the configured destination when
    /// `None`.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError::InvalidDestination`] before touching any file
    /// if the destination is not an existing directory.
    pub fn move_duplicates(
        &self,
        files: &[PathBuf],
        destination: Option<&Path>,
    ) -> Result<TransferResult, TransferError> {
        let destination = match destination {
            Some(dir) => dir.to_path_buf(),
            None => self.config.move_destination().map_err(|e| {
                log::error!("{}", e);
                TransferError::InvalidDestination(PathBuf::from("."))
            })?,
        };

        if files.is_empty() {
            log::warn!("No files to move to {}", destination.display());
            return Ok(TransferResult::new(TransferKind::Move));
        }
        move_batch(files, &destination, &self.transfer_config())
    }

    /// Delete `files`, permanently or to the trash per configuration.
    #[must_use]
    pub fn delete_duplicates(&self, files: &[PathBuf]) -> TransferResult {
        if files.is_empty() {
            log::warn!("No files to delete");
        }
        delete_batch(files, &self.transfer_config())
    }
}
