//! Perceptual-similarity stage.
//!
//! Each image is reduced to a fixed-length feature hash that stays stable
//! under resizing and re-encoding. Files whose hashes lie within a Hamming
//! distance threshold are considered the same picture.
//!
//! # Clustering policy
//!
//! Files are visited in input order. Each file not yet claimed becomes an
//! anchor and claims every unclaimed file within `threshold` of the anchor's
//! own hash. There is no chaining: `a ~ b` and `b ~ c` does not put `c` with
//! `a` unless `c` is also close to `a`. A threshold of 0 reduces to exact
//! hash equality.
//!
//! Neighbour lookup goes through a BK-tree over the distinct hashes, so
//! clustering stays well below quadratic for small thresholds.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

use bk_tree::{BKTree, Metric};
use image_hasher::{HashAlg, HasherConfig, ImageHash};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{check_shutdown, decode_image, Algorithm, AlgorithmError, DecodeError, Partition};
use crate::scanner::ValidatedFile;

/// Perceptual hash algorithm.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum PerceptualAlgorithm {
    /// DCT-based hash. Most robust to scaling and compression.
    #[default]
    Phash,
    /// Gradient (difference) hash.
    Dhash,
    /// Mean (average) hash. Fastest, least robust.
    Ahash,
}

impl PerceptualAlgorithm {
    /// A reasonable tolerant threshold for this algorithm at 8x8 hash size.
    #[must_use]
    pub fn suggested_threshold(&self) -> u32 {
        match self {
            Self::Phash => 10,
            Self::Dhash => 2,
            Self::Ahash => 5,
        }
    }

    fn hasher_config(self, hash_size: u32) -> HasherConfig {
        let config = HasherConfig::new().hash_size(hash_size, hash_size);
        match self {
            Self::Phash => config.hash_alg(HashAlg::Median).preproc_dct(),
            Self::Dhash => config.hash_alg(HashAlg::Gradient),
            Self::Ahash => config.hash_alg(HashAlg::Mean),
        }
    }
}

impl std::fmt::Display for PerceptualAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Phash => write!(f, "pHash"),
            Self::Dhash => write!(f, "dHash"),
            Self::Ahash => write!(f, "aHash"),
        }
    }
}

/// Hamming distance between image hashes.
#[derive(Default, Clone, Copy, Debug)]
pub struct ImageHashMetric;

impl Metric<ImageHash> for ImageHashMetric {
    fn distance(&self, a: &ImageHash, b: &ImageHash) -> u32 {
        a.dist(b)
    }

    fn threshold_distance(&self, a: &ImageHash, b: &ImageHash, threshold: u32) -> Option<u32> {
        let d = self.distance(a, b);
        (d <= threshold).then_some(d)
    }
}

/// BK-tree over distinct hashes, remembering which positions carry each one.
pub struct SimilarityIndex {
    tree: BKTree<ImageHash, ImageHashMetric>,
    positions: HashMap<Box<[u8]>, Vec<usize>>,
}

impl SimilarityIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: BKTree::new(ImageHashMetric),
            positions: HashMap::new(),
        }
    }

    /// Record that the file at `position` has `hash`.
    pub fn insert(&mut self, position: usize, hash: &ImageHash) {
        match self.positions.entry(hash.as_bytes().into()) {
            Entry::Occupied(mut slot) => slot.get_mut().push(position),
            Entry::Vacant(slot) => {
                self.tree.add(hash.clone());
                slot.insert(vec![position]);
            }
        }
    }

    /// Positions whose hash is within `max_distance` of `hash`, ascending.
    #[must_use]
    pub fn find(&self, hash: &ImageHash, max_distance: u32) -> Vec<usize> {
        let mut found: Vec<usize> = self
            .tree
            .find(hash, max_distance)
            .filter_map(|(_, neighbour)| self.positions.get(neighbour.as_bytes()))
            .flatten()
            .copied()
            .collect();
        found.sort_unstable();
        found
    }

    /// Number of distinct hashes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Check if the index is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl Default for SimilarityIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// Groups files whose perceptual hashes are within a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerceptualStage {
    algorithm: PerceptualAlgorithm,
    hash_size: u32,
    threshold: u32,
}

impl Default for PerceptualStage {
    fn default() -> Self {
        Self::new(PerceptualAlgorithm::default())
    }
}

impl PerceptualStage {
    /// Stage with 8x8 hashes and exact-equality matching.
    #[must_use]
    pub fn new(algorithm: PerceptualAlgorithm) -> Self {
        Self {
            algorithm,
            hash_size: 8,
            threshold: 0,
        }
    }

    /// Set the maximum Hamming distance between matching hashes.
    #[must_use]
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the hash side length in bits (clamped to 2..=64).
    #[must_use]
    pub fn with_hash_size(mut self, size: u32) -> Self {
        self.hash_size = size.clamp(2, 64);
        self
    }

    /// Hash algorithm in use.
    #[must_use]
    pub fn algorithm(&self) -> PerceptualAlgorithm {
        self.algorithm
    }

    /// Matching threshold in use.
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    fn hasher(&self) -> image_hasher::Hasher {
        self.algorithm.hasher_config(self.hash_size).to_hasher()
    }

    /// Hash a single file.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the image cannot be decoded.
    pub fn hash_file(&self, file: &ValidatedFile) -> Result<ImageHash, DecodeError> {
        let img = decode_image(&file.path)?;
        Ok(self.hasher().hash_image(&img))
    }
}

impl Algorithm for PerceptualStage {
    fn name(&self) -> &'static str {
        "perceptual"
    }

    fn partition(
        &self,
        files: &[ValidatedFile],
        shutdown: Option<&AtomicBool>,
    ) -> Result<Partition, AlgorithmError> {
        let hashes: Vec<Option<ImageHash>> = files
            .par_iter()
            .map_init(
                || self.hasher(),
                |hasher, file| -> Result<Option<ImageHash>, AlgorithmError> {
                    check_shutdown(shutdown)?;
                    match decode_image(&file.path) {
                        Ok(img) => Ok(Some(hasher.hash_image(&img))),
                        Err(e) => {
                            log::warn!("Perceptual stage skipping {}", e);
                            Ok(None)
                        }
                    }
                },
            )
            .collect::<Result<_, AlgorithmError>>()?;

        let mut index = SimilarityIndex::new();
        for (position, hash) in hashes.iter().enumerate() {
            if let Some(hash) = hash {
                index.insert(position, hash);
            }
        }

        let mut labels: Vec<Option<usize>> = vec![None; files.len()];
        for (anchor, hash) in hashes.iter().enumerate() {
            let Some(hash) = hash else { continue };
            if labels[anchor].is_some() {
                continue;
            }
            for position in index.find(hash, self.threshold) {
                if labels[position].is_none() {
                    labels[position] = Some(anchor);
                }
            }
        }

        let partition = Partition::from_labels(files, &labels);
        log::debug!(
            "{} stage ({}, threshold {}): {} file(s) -> {} class(es), {} excluded",
            self.name(),
            self.algorithm,
            self.threshold,
            files.len(),
            partition.classes.len(),
            partition.excluded.len()
        );
        Ok(partition)
    }
}
