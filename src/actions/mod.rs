//! File actions module: the file transfer operator.
//!
//! This module provides functionality for:
//! - Moving duplicates into a destination directory (last write wins)
//! - Permanent deletion or deletion to the system trash
//! - Per-file failure isolation with an aggregate [`TransferResult`]
//!
//! ```no_run
//! use picdupe::actions::{delete_batch, move_batch, TransferConfig};
//! use std::path::{Path, PathBuf};
//!
//! let files = vec![PathBuf::from("/photos/dup.jpg")];
//! let config = TransferConfig::default();
//!
//! let moved = move_batch(&files, Path::new("/photos/dupes"), &config).unwrap();
//! println!("{}", moved.summary());
//!
//! let deleted = delete_batch(&files, &config.with_permanent(false));
//! println!("{}", deleted.summary());
//! ```

pub mod delete;
pub mod mover;
pub mod transfer;

// Re-export commonly used types
pub use delete::{delete_batch, delete_file, delete_to_trash, permanent_delete};
pub use mover::{check_destination, move_batch, move_file};
pub use transfer::{
    validate_preserves_originals, TransferConfig, TransferError, TransferFailure, TransferKind,
    TransferRecord, TransferResult,
};
