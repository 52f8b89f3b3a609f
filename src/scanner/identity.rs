//! Physical file identity.
//!
//! Two paths name the same file when they resolve to the same on-disk
//! object: `photos/a.png` and `/home/me/photos/a.png`, `dir/sub/../a.png`,
//! a symlink and its target, or two hardlinks. Such paths must never be
//! compared against each other as duplicates, since removing one removes
//! (or unlinks) the only copy.
//!
//! # Platform Support
//!
//! - **Unix**: `(device_id, inode)` from file metadata, which also catches
//!   hardlinks
//! - **Other**: the canonicalized path

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Identity of the file a path resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileIdentity {
    /// Device and inode number.
    Inode {
        /// Device id
        dev: u64,
        /// Inode number
        ino: u64,
    },
    /// Canonical path, or the path as given when it cannot be resolved.
    Path(PathBuf),
}

impl FileIdentity {
    /// Resolve the identity of the file at `path`, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be stat'ed or resolved.
    #[cfg(unix)]
    pub fn of(path: &Path) -> io::Result<Self> {
        use std::os::unix::fs::MetadataExt;
        let metadata = fs::metadata(path)?;
        Ok(Self::Inode {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    /// Resolve the identity of the file at `path`, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be resolved.
    #[cfg(not(unix))]
    pub fn of(path: &Path) -> io::Result<Self> {
        fs::canonicalize(path).map(Self::Path)
    }

    /// Like [`of`](Self::of), falling back to the literal path for files
    /// that cannot be resolved (for instance because they vanished).
    #[must_use]
    pub fn resolve(path: &Path) -> Self {
        Self::of(path).unwrap_or_else(|e| {
            log::trace!("Cannot resolve {}: {}", path.display(), e);
            Self::Path(path.to_path_buf())
        })
    }
}

/// Remembers which files have been seen, under any name.
#[derive(Debug, Default)]
pub struct IdentityTracker {
    seen: HashSet<FileIdentity>,
}

impl IdentityTracker {
    /// Create an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `identity`; `true` if it had not been seen before.
    pub fn first_sighting(&mut self, identity: FileIdentity) -> bool {
        self.seen.insert(identity)
    }

    /// Whether `identity` was recorded.
    #[must_use]
    pub fn contains(&self, identity: &FileIdentity) -> bool {
        self.seen.contains(identity)
    }

    /// Number of distinct files seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Check if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
