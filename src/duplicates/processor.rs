//! Duplicate processor: grouping followed by the refinement chain.
//!
//! # Pipeline
//!
//! 1. **Group**: full-content signatures put files into buckets
//!    (see [`group_by_signature`]). Singleton buckets are dropped.
//! 2. **Refine**: each remaining bucket goes through the enabled
//!    [`Algorithm`]s in order. Every stage runs on each class the previous
//!    stage produced, and classes that shrink to one file are dropped.
//! 3. **Assemble**: the first file of each surviving class (in input order)
//!    is kept, the rest become its duplicates.
//!
//! The processor never touches the filesystem beyond reading.
//!
//! # Example
//!
//! ```no_run
//! use picdupe::duplicates::{DuplicateProcessor, ProcessorConfig};
//! use picdupe::scanner::FileValidator;
//! use std::path::PathBuf;
//!
//! let files = FileValidator::default()
//!     .validate(&[PathBuf::from("./photos")])
//!     .unwrap();
//! let processor = DuplicateProcessor::with_defaults(ProcessorConfig::default());
//! let (map, summary) = processor.compare(&files).unwrap();
//!
//! println!("{} duplicate(s) in {} group(s)", summary.duplicate_files, summary.duplicate_groups);
//! for entry in &map {
//!     println!("{} <- {:?}", entry.original.display(), entry.duplicates);
//! }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use serde::Serialize;

use super::algorithms::{Algorithm, AlgorithmError, PerceptualStage, PixelExactStage};
use super::groups::{group_by_signature, prune_singletons};
use super::map::DuplicateMap;
use crate::pool::run_in_pool;
use crate::progress::ProgressCallback;
use crate::scanner::signature::SignatureError;
use crate::scanner::{
    FileIdentity, IdentityTracker, SignatureAlgorithm, SignatureHasher, ValidatedFile,
};

/// Errors that abort a comparison run.
#[derive(thiserror::Error, Debug)]
pub enum ProcessorError {
    /// Cancellation was requested.
    #[error("Comparison interrupted")]
    Interrupted,

    /// A file could not be read while computing its signature.
    #[error("Signature computation failed: {0}")]
    Signature(#[source] SignatureError),
}

impl From<SignatureError> for ProcessorError {
    fn from(error: SignatureError) -> Self {
        match error {
            SignatureError::Interrupted => Self::Interrupted,
            other => Self::Signature(other),
        }
    }
}

impl From<AlgorithmError> for ProcessorError {
    fn from(error: AlgorithmError) -> Self {
        match error {
            AlgorithmError::Interrupted => Self::Interrupted,
        }
    }
}

/// Configuration for the duplicate processor.
#[derive(Clone)]
pub struct ProcessorConfig {
    /// Worker threads for signature computation and decoding.
    pub io_threads: usize,
    /// Coarse signature algorithm.
    pub signature: SignatureAlgorithm,
    /// Optional cancellation flag.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for ProcessorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorConfig")
            .field("io_threads", &self.io_threads)
            .field("signature", &self.signature)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            signature: SignatureAlgorithm::default(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl ProcessorConfig {
    /// Set the number of worker threads.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the coarse signature algorithm.
    #[must_use]
    pub fn with_signature(mut self, signature: SignatureAlgorithm) -> Self {
        self.signature = signature;
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
}

/// Statistics for one comparison run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompareSummary {
    /// Distinct files handed to the processor (aliases counted once)
    pub total_files: usize,
    /// Distinct content signatures
    pub buckets: usize,
    /// Files in buckets of 2+ (entered refinement)
    pub candidate_files: usize,
    /// Classes of 2+ that survived refinement
    pub duplicate_groups: usize,
    /// Files marked as duplicates (representatives excluded)
    pub duplicate_files: usize,
    /// Files a stage could not decode
    pub decode_failures: usize,
    /// Wall-clock time of the run
    pub duration: Duration,
}

/// Outcome of refining one bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Refinement {
    /// Surviving classes of 2+ files, members in input order
    pub classes: Vec<Vec<ValidatedFile>>,
    /// Files dropped because some stage could not decode them
    pub decode_failures: usize,
}

/// Orchestrates grouping and refinement into a [`DuplicateMap`].
pub struct DuplicateProcessor {
    config: ProcessorConfig,
    algorithms: Vec<Box<dyn Algorithm>>,
}

impl std::fmt::Debug for DuplicateProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateProcessor")
            .field("config", &self.config)
            .field("algorithms", &self.algorithm_names())
            .finish()
    }
}

impl DuplicateProcessor {
    /// Create a processor with an explicit, ordered algorithm chain.
    ///
    /// An empty chain makes signature equality the only criterion.
    #[must_use]
    pub fn new(config: ProcessorConfig, algorithms: Vec<Box<dyn Algorithm>>) -> Self {
        Self { config, algorithms }
    }

    /// Create a processor running perceptual then pixel-exact refinement.
    #[must_use]
    pub fn with_defaults(config: ProcessorConfig) -> Self {
        Self::new(
            config,
            vec![
                Box::new(PerceptualStage::default()),
                Box::new(PixelExactStage::new()),
            ],
        )
    }

    /// Names of the enabled stages, in order.
    #[must_use]
    pub fn algorithm_names(&self) -> Vec<&'static str> {
        self.algorithms.iter().map(|a| a.name()).collect()
    }

    fn shutdown(&self) -> Option<&AtomicBool> {
        self.config.shutdown_flag.as_deref()
    }

    fn is_shutdown_requested(&self) -> bool {
        crate::signal::is_cancelled(self.shutdown())
    }

    /// Run the algorithm chain over one bucket.
    ///
    /// Runs on the current rayon pool.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessorError::Interrupted`] on cancellation.
    pub fn refine(&self, bucket: &[ValidatedFile]) -> Result<Refinement, ProcessorError> {
        let mut refinement = Refinement {
            classes: vec![bucket.to_vec()],
            decode_failures: 0,
        };
        refinement.classes.retain(|c| c.len() > 1);

        for algorithm in &self.algorithms {
            let mut next = Vec::new();
            for class in &refinement.classes {
                let partition = algorithm.partition(class, self.shutdown())?;
                refinement.decode_failures += partition.excluded.len();
                next.extend(partition.classes.into_iter().filter(|c| c.len() > 1));
            }
            refinement.classes = next;

            if refinement.classes.is_empty() {
                break;
            }
        }

        Ok(refinement)
    }

    /// Classify validated files into a duplicate map.
    ///
    /// The kept representative of each class is its first member in input
    /// order, so the result is stable for a given input order. Paths in
    /// `files` that name the same physical file are collapsed to their first
    /// occurrence.
    ///
    /// # Errors
    ///
    /// - [`ProcessorError::Signature`] if a file cannot be read for grouping
    /// - [`ProcessorError::Interrupted`] on cancellation
    pub fn compare(
        &self,
        files: &[ValidatedFile],
    ) -> Result<(DuplicateMap, CompareSummary), ProcessorError> {
        let start = Instant::now();

        // A file listed under two names must not be compared with itself
        let mut seen = IdentityTracker::new();
        let files: Vec<ValidatedFile> = files
            .iter()
            .filter(|f| {
                let first = seen.first_sighting(FileIdentity::resolve(&f.path));
                if !first {
                    log::debug!("Same file listed twice, ignoring: {}", f.path.display());
                }
                first
            })
            .cloned()
            .collect();

        let mut summary = CompareSummary {
            total_files: files.len(),
            ..Default::default()
        };

        if files.is_empty() {
            log::debug!("Comparison: no files to process");
            return Ok((DuplicateMap::new(), summary));
        }
        if self.is_shutdown_requested() {
            return Err(ProcessorError::Interrupted);
        }

        log::info!(
            "Comparing {} files (stages: {})",
            files.len(),
            if self.algorithms.is_empty() {
                "signature only".to_string()
            } else {
                self.algorithm_names().join(" -> ")
            }
        );

        let mut hasher = SignatureHasher::new(self.config.signature);
        if let Some(ref flag) = self.config.shutdown_flag {
            hasher = hasher.with_shutdown_flag(Arc::clone(flag));
        }
        let progress = self.config.progress_callback.as_deref();

        let refinements = run_in_pool(self.config.io_threads, || {
            let (buckets, stats) = group_by_signature(&files, &hasher, progress)?;
            summary.buckets = stats.unique_signatures;
            summary.candidate_files = stats.potential_duplicates;

            let candidates = prune_singletons(buckets);
            if let Some(callback) = progress {
                callback.on_phase_start("refining", candidates.len());
            }

            let done = AtomicUsize::new(0);
            let refinements: Vec<Refinement> = candidates
                .par_iter()
                .map(|bucket| {
                    let refinement = self.refine(&bucket.files);
                    if let Some(callback) = progress {
                        let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                        let label = bucket
                            .files
                            .first()
                            .map(|f| f.path.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        callback.on_progress(current, &label);
                    }
                    refinement
                })
                .collect::<Result<_, ProcessorError>>()?;

            if let Some(callback) = progress {
                callback.on_phase_end("refining");
            }
            Ok::<_, ProcessorError>(refinements)
        })?;

        // Single merge point: order classes by their representative's position
        let positions: HashMap<&PathBuf, usize> = files
            .iter()
            .enumerate()
            .map(|(i, f)| (&f.path, i))
            .collect();

        let mut classes: Vec<Vec<ValidatedFile>> = Vec::new();
        for refinement in refinements {
            summary.decode_failures += refinement.decode_failures;
            classes.extend(refinement.classes);
        }
        classes.sort_by_key(|class| {
            class
                .first()
                .and_then(|f| positions.get(&f.path).copied())
                .unwrap_or(usize::MAX)
        });

        let mut map = DuplicateMap::new();
        for class in classes {
            let mut members = class.into_iter().map(|f| f.path);
            let Some(original) = members.next() else {
                continue;
            };
            let duplicates: Vec<PathBuf> = members.collect();
            log::debug!(
                "Duplicate class: {} + {} duplicate(s)",
                original.display(),
                duplicates.len()
            );
            map.insert(original, duplicates);
        }

        summary.duplicate_groups = map.len();
        summary.duplicate_files = map.duplicate_count();
        summary.duration = start.elapsed();

        log::info!(
            "Comparison complete: {} group(s), {} duplicate file(s), {} decode failure(s) in {:.2}s",
            summary.duplicate_groups,
            summary.duplicate_files,
            summary.decode_failures,
            summary.duration.as_secs_f64()
        );

        Ok((map, summary))
    }
}
