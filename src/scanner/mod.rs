//! Scanner module: turning caller-supplied paths into validated images.
//!
//! This module provides functionality for:
//! - Expanding input directories with a bounded recursion depth
//! - Content-sniffing candidate files (magic bytes + decodable header)
//! - Computing full-content signatures used by the coarse grouper
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`validator`]: directory expansion and the parallel validation pass
//! - [`predicate`]: the content-based image predicate
//! - [`identity`]: physical file identity, so aliased paths count once
//! - [`signature`]: CRC32 / BLAKE3 full-content signatures
//!
//! # Example
//!
//! ```no_run
//! use picdupe::scanner::{FileValidator, ValidatorConfig};
//! use std::path::PathBuf;
//!
//! let validator = FileValidator::new(ValidatorConfig::default().with_max_depth(1));
//! let files = validator.validate(&[PathBuf::from("./photos")]).unwrap();
//! for file in &files {
//!     println!("{} ({}x{})", file.path.display(), file.width, file.height);
//! }
//! ```

pub mod identity;
pub mod predicate;
pub mod signature;
pub mod validator;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use image::ImageFormat;

use crate::progress::ProgressCallback;

// Re-export main types
pub use identity::{FileIdentity, IdentityTracker};
pub use predicate::{sniff_image, ImageInfo};
pub use signature::{ContentSignature, SignatureAlgorithm, SignatureHasher};
pub use validator::FileValidator;

/// Depth value meaning "recurse without limit".
pub const UNBOUNDED_DEPTH: usize = usize::MAX;

/// A path that has been looked at but not yet accepted into the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePath {
    /// Path as supplied or discovered during expansion
    pub path: PathBuf,
    /// Whether anything exists at the path
    pub exists: bool,
    /// Whether the path resolves to a regular file
    pub is_file: bool,
    /// Whether the path resolves to a directory
    pub is_dir: bool,
}

impl CandidatePath {
    /// Inspect a path on disk.
    ///
    /// A missing path is not an error here; it is reported through `exists`.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error for anything other than `NotFound`
    /// (typically `PermissionDenied` on a parent directory).
    pub fn inspect(path: &Path) -> io::Result<Self> {
        match fs::metadata(path) {
            Ok(metadata) => Ok(Self {
                path: path.to_path_buf(),
                exists: true,
                is_file: metadata.is_file(),
                is_dir: metadata.is_dir(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::missing(path)),
            Err(e) => Err(e),
        }
    }

    /// A candidate discovered during expansion that is known to be a regular file.
    #[must_use]
    pub fn file(path: PathBuf) -> Self {
        Self {
            path,
            exists: true,
            is_file: true,
            is_dir: false,
        }
    }

    fn missing(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            exists: false,
            is_file: false,
            is_dir: false,
        }
    }
}

/// A file confirmed by content sniffing to be a readable, supported image.
///
/// Created by the validator and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFile {
    /// Path to the image
    pub path: PathBuf,
    /// File size in bytes at validation time
    pub size: u64,
    /// Detected container format
    pub format: ImageFormat,
    /// Pixel width read from the header
    pub width: u32,
    /// Pixel height read from the header
    pub height: u32,
}

impl ValidatedFile {
    /// Build a validated file from a path and the sniffed image information.
    #[must_use]
    pub fn new(path: PathBuf, info: ImageInfo) -> Self {
        Self {
            path,
            size: info.size,
            format: info.format,
            width: info.width,
            height: info.height,
        }
    }

    /// Short lowercase format name, e.g. `png` or `jpg`.
    #[must_use]
    pub fn format_name(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("unknown")
    }
}

/// Configuration for the file validator.
#[derive(Clone)]
pub struct ValidatorConfig {
    /// Maximum recursion depth below each input directory.
    /// `1` lists immediate children only; [`UNBOUNDED_DEPTH`] is recursive mode.
    pub max_depth: usize,
    /// Follow symbolic links during expansion.
    pub follow_symlinks: bool,
    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,
    /// Number of worker threads used for content sniffing.
    pub io_threads: usize,
    /// Optional cancellation flag, checked between files.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for ValidatorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorConfig")
            .field("max_depth", &self.max_depth)
            .field("follow_symlinks", &self.follow_symlinks)
            .field("skip_hidden", &self.skip_hidden)
            .field("io_threads", &self.io_threads)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            follow_symlinks: false,
            skip_hidden: false,
            io_threads: 4,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl ValidatorConfig {
    /// Set the maximum recursion depth (clamped to at least 1).
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    /// Switch between recursive mode and immediate-children-only.
    #[must_use]
    pub fn with_recursive(self, recursive: bool) -> Self {
        self.with_max_depth(if recursive { UNBOUNDED_DEPTH } else { 1 })
    }

    /// Follow symbolic links during expansion.
    #[must_use]
    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Skip hidden entries during expansion.
    #[must_use]
    pub fn with_skip_hidden(mut self, skip: bool) -> Self {
        self.skip_hidden = skip;
        self
    }

    /// Set the number of sniffing threads.
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
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

/// Errors that abort a whole validation call.
///
/// Files that simply are not images never produce one of these.
#[derive(thiserror::Error, Debug)]
pub enum ValidateError {
    /// An input path does not exist (or vanished during expansion).
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while accessing a path.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Directory traversal failed without an underlying I/O error.
    #[error("Directory walk failed at {path}: {message}")]
    Walk {
        /// Path where the walk failed
        path: PathBuf,
        /// Description from the walker
        message: String,
    },

    /// Validation was cancelled between files.
    #[error("Validation interrupted")]
    Interrupted,
}

impl ValidateError {
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

    /// Path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::Io { path: p, .. }
            | Self::Walk { path: p, .. } => Some(p),
            Self::Interrupted => None,
        }
    }
}
