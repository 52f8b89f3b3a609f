//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Coarse grouping by full-content signature
//! - Pluggable refinement stages (perceptual, pixel-exact)
//! - Orchestration into a [`DuplicateMap`]

pub mod algorithms;
pub mod groups;
pub mod map;
pub mod processor;

pub use algorithms::{
    Algorithm, AlgorithmError, DecodeError, Partition, PerceptualAlgorithm, PerceptualStage,
    PixelExactStage,
};
pub use groups::{group_by_signature, prune_singletons, Bucket, GroupingStats};
pub use map::{DuplicateEntry, DuplicateMap};
pub use processor::{
    CompareSummary, DuplicateProcessor, ProcessorConfig, ProcessorError, Refinement,
};
