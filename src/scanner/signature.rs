//! Full-content signatures for coarse bucketing.
//!
//! # Overview
//!
//! A [`ContentSignature`] is a cheap digest of a file's *complete* content.
//! It is used only as a bucketing key: two byte-identical files always get
//! the same signature, while a collision merely sends two different files
//! through the more expensive refinement stages.
//!
//! Files are streamed through the checksum in fixed-size chunks, so memory use
//! does not depend on file size. The cancellation flag is checked between
//! chunks, which keeps a single huge file from delaying shutdown.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Read buffer size for streaming (64 KiB).
pub const BUFFER_SIZE: usize = 64 * 1024;

/// Checksum used to compute content signatures.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SignatureAlgorithm {
    /// CRC32 (IEEE). Fast, 32-bit, collisions are possible but harmless.
    #[default]
    Crc32,
    /// BLAKE3. Slower per byte but collisions are practically impossible.
    Blake3,
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crc32 => write!(f, "crc32"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

/// Fixed-size digest of a file's complete content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentSignature {
    /// CRC32 checksum
    Crc32(u32),
    /// BLAKE3 digest
    Blake3([u8; 32]),
}

impl ContentSignature {
    /// Hexadecimal representation of the digest.
    #[must_use]
    pub fn to_hex(&self) -> String {
        match self {
            Self::Crc32(value) => format!("{value:08x}"),
            Self::Blake3(bytes) => blake3::Hash::from(*bytes).to_hex().to_string(),
        }
    }
}

impl fmt::Display for ContentSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// Errors that can occur while computing a signature.
#[derive(thiserror::Error, Debug)]
pub enum SignatureError {
    /// The file vanished between validation and grouping.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Cancellation was requested while reading.
    #[error("Signature computation interrupted")]
    Interrupted,
}

impl SignatureError {
    fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }
}

/// Streaming signature calculator.
///
/// Holds no per-file state, so one instance is shared by all workers.
#[derive(Debug, Clone, Default)]
pub struct SignatureHasher {
    algorithm: SignatureAlgorithm,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

enum Digest {
    Crc32(crc32fast::Hasher),
    Blake3(Box<blake3::Hasher>),
}

impl Digest {
    fn update(&mut self, chunk: &[u8]) {
        match self {
            Self::Crc32(h) => h.update(chunk),
            Self::Blake3(h) => {
                h.update(chunk);
            }
        }
    }

    fn finish(self) -> ContentSignature {
        match self {
            Self::Crc32(h) => ContentSignature::Crc32(h.finalize()),
            Self::Blake3(h) => ContentSignature::Blake3(*h.finalize().as_bytes()),
        }
    }
}

impl SignatureHasher {
    /// Create a hasher for the given algorithm.
    #[must_use]
    pub fn new(algorithm: SignatureAlgorithm) -> Self {
        Self {
            algorithm,
            shutdown_flag: None,
        }
    }

    /// Set the cancellation flag checked between chunks.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Algorithm used by this hasher.
    #[must_use]
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    fn digest(&self) -> Digest {
        match self.algorithm {
            SignatureAlgorithm::Crc32 => Digest::Crc32(crc32fast::Hasher::new()),
            SignatureAlgorithm::Blake3 => Digest::Blake3(Box::new(blake3::Hasher::new())),
        }
    }

    fn is_shutdown_requested(&self) -> bool {
        crate::signal::is_cancelled(self.shutdown_flag.as_deref())
    }

    /// Compute the signature of an in-memory buffer.
    #[must_use]
    pub fn hash_bytes(&self, data: &[u8]) -> ContentSignature {
        let mut digest = self.digest();
        digest.update(data);
        digest.finish()
    }

    /// Compute the signature of a file's complete content.
    ///
    /// # Errors
    ///
    /// Returns `SignatureError` if the file cannot be read or cancellation is
    /// requested mid-file.
    pub fn hash_file(&self, path: &Path) -> Result<ContentSignature, SignatureError> {
        let mut file = File::open(path).map_err(|e| SignatureError::from_io(path, e))?;
        let mut digest = self.digest();
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            if self.is_shutdown_requested() {
                return Err(SignatureError::Interrupted);
            }

            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(SignatureError::from_io(path, e)),
            };
            digest.update(&buffer[..read]);
        }

        Ok(digest.finish())
    }
}
