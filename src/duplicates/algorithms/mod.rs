//! Refinement stages that split candidate buckets into duplicate classes.
//!
//! Each stage implements [`Algorithm`]: given a set of files it returns a
//! [`Partition`] into equivalence classes under its own notion of "same
//! image". Stages are chained by running each one on every class the
//! previous stage produced, so a pair survives only if every enabled stage
//! agrees.
//!
//! - [`PerceptualStage`]: feature hash within a Hamming-distance threshold
//! - [`PixelExactStage`]: decoded pixel buffers must be identical

pub mod perceptual;
pub mod pixel;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use image::{DynamicImage, ImageReader};

use crate::scanner::ValidatedFile;

pub use perceptual::{PerceptualAlgorithm, PerceptualStage, SimilarityIndex};
pub use pixel::PixelExactStage;

/// Result of running one stage over a set of files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Equivalence classes. Members keep input order and classes are ordered
    /// by their first member. Singleton classes are included.
    pub classes: Vec<Vec<ValidatedFile>>,
    /// Files this stage could not decode. They belong to no class.
    pub excluded: Vec<ValidatedFile>,
}

impl Partition {
    /// Every file in its own class.
    #[must_use]
    pub fn singletons(files: &[ValidatedFile]) -> Self {
        Self {
            classes: files.iter().cloned().map(|f| vec![f]).collect(),
            excluded: Vec::new(),
        }
    }

    /// Number of classes with 2+ members.
    #[must_use]
    pub fn duplicate_classes(&self) -> usize {
        self.classes.iter().filter(|c| c.len() > 1).count()
    }

    /// Build a partition from per-position class labels.
    ///
    /// `labels[i]` is the class of `files[i]`, or `None` if it was excluded.
    /// Labels are opaque; classes are emitted in first-member order.
    pub(crate) fn from_labels(files: &[ValidatedFile], labels: &[Option<usize>]) -> Self {
        let mut slots: std::collections::HashMap<usize, usize> = std::collections::HashMap::new();
        let mut partition = Self::default();

        for (file, label) in files.iter().zip(labels) {
            match label {
                Some(label) => {
                    let slot = *slots.entry(*label).or_insert_with(|| {
                        partition.classes.push(Vec::new());
                        partition.classes.len() - 1
                    });
                    partition.classes[slot].push(file.clone());
                }
                None => partition.excluded.push(file.clone()),
            }
        }

        partition
    }
}

/// Errors that abort a stage as a whole.
///
/// Per-file decode failures are not errors at this level; they end up in
/// [`Partition::excluded`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmError {
    /// Cancellation was requested between files.
    #[error("Comparison interrupted")]
    Interrupted,
}

/// A file could not be decoded into pixels.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    /// The file could not be opened or read.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path of the file
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The image data is corrupt or unsupported.
    #[error("Failed to decode {path}: {source}")]
    Image {
        /// Path of the file
        path: PathBuf,
        /// The underlying decoder error
        #[source]
        source: image::ImageError,
    },
}

/// Decode an image, detecting the format from content rather than extension.
///
/// # Errors
///
/// Returns [`DecodeError`] if the file cannot be read or decoded.
pub fn decode_image(path: &Path) -> Result<DynamicImage, DecodeError> {
    let io_err = |source| DecodeError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(io_err)?;
    ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .map_err(io_err)?
        .decode()
        .map_err(|source| DecodeError::Image {
            path: path.to_path_buf(),
            source,
        })
}

/// A refinement stage.
///
/// Implementations hold only configuration; all per-run state lives inside
/// [`partition`](Algorithm::partition). Parallel work runs on the caller's
/// rayon pool.
pub trait Algorithm: Send + Sync {
    /// Short name for logs and summaries.
    fn name(&self) -> &'static str;

    /// Split `files` into duplicate equivalence classes.
    ///
    /// # Errors
    ///
    /// Returns [`AlgorithmError::Interrupted`] if `shutdown` is set while
    /// files are still pending.
    fn partition(
        &self,
        files: &[ValidatedFile],
        shutdown: Option<&AtomicBool>,
    ) -> Result<Partition, AlgorithmError>;
}

pub(crate) fn check_shutdown(shutdown: Option<&AtomicBool>) -> Result<(), AlgorithmError> {
    if crate::signal::is_cancelled(shutdown) {
        Err(AlgorithmError::Interrupted)
    } else {
        Ok(())
    }
}
