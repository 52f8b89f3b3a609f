//! Coarse grouping by full-content signature.
//!
//! # Overview
//!
//! The coarse grouper is the cheap, high-recall first stage of comparison.
//! Every validated file is read once from start to end and folded into a
//! [`ContentSignature`]; files sharing a signature land in the same
//! [`Bucket`].
//!
//! Because the signature covers the complete content, two byte-identical
//! files can never end up in different buckets. Two *different* files may
//! still share a bucket on a checksum collision; the refinement stages sort
//! that out.
//!
//! # Example
//!
//! ```no_run
//! use picdupe::duplicates::{group_by_signature, prune_singletons};
//! use picdupe::scanner::{FileValidator, SignatureHasher};
//! use std::path::PathBuf;
//!
//! let files = FileValidator::default()
//!     .validate(&[PathBuf::from("./photos")])
//!     .unwrap();
//! let (buckets, stats) = group_by_signature(&files, &SignatureHasher::default(), None).unwrap();
//! let candidates = prune_singletons(buckets);
//!
//! println!("{:.1}% eliminated as unique", stats.elimination_rate());
//! println!("{} bucket(s) need refinement", candidates.len());
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::progress::ProgressCallback;
use crate::scanner::signature::SignatureError;
use crate::scanner::{ContentSignature, SignatureHasher, ValidatedFile};

/// Files sharing one content signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    /// Signature shared by every file in the bucket
    pub signature: ContentSignature,
    /// Members, in input order
    pub files: Vec<ValidatedFile>,
}

impl Bucket {
    /// Number of files in this bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this bucket is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Check if this bucket can contain duplicates (2+ files).
    #[must_use]
    pub fn has_candidates(&self) -> bool {
        self.files.len() > 1
    }

    /// Total size of all files in this bucket.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

/// Statistics from the grouping stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingStats {
    /// Total number of files processed
    pub total_files: usize,
    /// Total size of all files in bytes
    pub total_size: u64,
    /// Number of distinct signatures
    pub unique_signatures: usize,
    /// Files in buckets of 2+
    pub potential_duplicates: usize,
    /// Files alone in their bucket
    pub eliminated_unique: usize,
    /// Buckets with 2+ files
    pub candidate_buckets: usize,
}

impl GroupingStats {
    /// Percentage of files eliminated by grouping.
    #[must_use]
    pub fn elimination_rate(&self) -> f64 {
        if self.total_files == 0 {
            0.0
        } else {
            (self.eliminated_unique as f64 / self.total_files as f64) * 100.0
        }
    }
}

/// Bucket files by full-content signature.
///
/// Signatures are computed in parallel on the current rayon pool and merged
/// in input order, so buckets are ordered by the input position of their
/// first member and members keep their relative order. Every input file
/// appears in exactly one bucket, singletons included.
///
/// # Errors
///
/// Returns the first [`SignatureError`] hit. A file that cannot be read here
/// has no knowable bucket, so the whole grouping fails.
pub fn group_by_signature(
    files: &[ValidatedFile],
    hasher: &SignatureHasher,
    progress: Option<&dyn ProgressCallback>,
) -> Result<(Vec<Bucket>, GroupingStats), SignatureError> {
    let mut stats = GroupingStats {
        total_files: files.len(),
        total_size: files.iter().map(|f| f.size).sum(),
        ..Default::default()
    };

    if files.is_empty() {
        log::debug!("Grouping: no files to process");
        return Ok((Vec::new(), stats));
    }

    if let Some(callback) = progress {
        callback.on_phase_start("grouping", files.len());
    }
    log::info!(
        "Computing {} signatures for {} files",
        hasher.algorithm(),
        files.len()
    );

    let processed = AtomicUsize::new(0);
    let signatures: Vec<ContentSignature> = files
        .par_iter()
        .map(|file| -> Result<ContentSignature, SignatureError> {
            let signature = hasher.hash_file(&file.path)?;
            if let Some(callback) = progress {
                let current = processed.fetch_add(1, Ordering::Relaxed) + 1;
                callback.on_progress(current, &file.path.to_string_lossy());
                callback.on_item_completed(file.size);
            }
            log::trace!("{} {}", signature, file.path.display());
            Ok(signature)
        })
        .collect::<Result<_, SignatureError>>()?;

    if let Some(callback) = progress {
        callback.on_phase_end("grouping");
    }

    // Single merge point
    let mut index: HashMap<ContentSignature, usize> = HashMap::new();
    let mut buckets: Vec<Bucket> = Vec::new();
    for (file, signature) in files.iter().zip(signatures) {
        let slot = *index.entry(signature).or_insert_with(|| {
            buckets.push(Bucket {
                signature,
                files: Vec::new(),
            });
            buckets.len() - 1
        });
        buckets[slot].files.push(file.clone());
    }

    stats.unique_signatures = buckets.len();
    for bucket in &buckets {
        if bucket.has_candidates() {
            stats.candidate_buckets += 1;
            stats.potential_duplicates += bucket.len();
        } else {
            stats.eliminated_unique += bucket.len();
        }
    }

    log::info!(
        "Grouping complete: {} signature(s), {} candidate bucket(s), {:.1}% eliminated",
        stats.unique_signatures,
        stats.candidate_buckets,
        stats.elimination_rate()
    );

    Ok((buckets, stats))
}

/// Drop buckets with a single member, keeping order.
#[must_use]
pub fn prune_singletons(buckets: Vec<Bucket>) -> Vec<Bucket> {
    buckets.into_iter().filter(Bucket::has_candidates).collect()
}
