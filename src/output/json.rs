//! JSON reports.
//!
//! # Duplicate report schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     { "original": "/photos/a.png", "duplicates": ["/photos/a_copy.png"] }
//!   ],
//!   "summary": {
//!     "total_files": 3,
//!     "buckets": 2,
//!     "candidate_files": 2,
//!     "duplicate_groups": 1,
//!     "duplicate_files": 1,
//!     "decode_failures": 0,
//!     "duration_ms": 12,
//!     "exit_code": 0,
//!     "exit_code_name": "PD000"
//!   }
//! }
//! ```
//!
//! Paths are printed as given on the command line; `original` is the file
//! that would be kept.

use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;

use crate::actions::{TransferKind, TransferRecord, TransferResult};
use crate::duplicates::{CompareSummary, DuplicateMap};
use crate::error::ExitCode;
use crate::scanner::ValidatedFile;

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}

/// Comparison statistics in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Files compared
    pub total_files: usize,
    /// Distinct content signatures
    pub buckets: usize,
    /// Files sharing a signature with another file
    pub candidate_files: usize,
    /// Duplicate classes found
    pub duplicate_groups: usize,
    /// Files that would be moved or deleted
    pub duplicate_files: usize,
    /// Files dropped because they could not be decoded
    pub decode_failures: usize,
    /// Wall-clock time in milliseconds
    pub duration_ms: u64,
    /// Process exit code
    pub exit_code: i32,
    /// Machine-readable exit code name
    pub exit_code_name: String,
}

impl JsonSummary {
    /// Convert a run summary.
    #[must_use]
    pub fn new(summary: &CompareSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            buckets: summary.buckets,
            candidate_files: summary.candidate_files,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            decode_failures: summary.decode_failures,
            duration_ms: u64::try_from(summary.duration.as_millis()).unwrap_or(u64::MAX),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Duplicate map report.
#[derive(Debug, Serialize)]
pub struct JsonDuplicates<'a> {
    /// Classes in representative order
    pub duplicates: &'a DuplicateMap,
    /// Run statistics
    pub summary: JsonSummary,
}

impl<'a> JsonDuplicates<'a> {
    /// Build the report.
    ///
    /// ```
    /// use picdupe::duplicates::{CompareSummary, DuplicateMap};
    /// use picdupe::error::ExitCode;
    /// use picdupe::output::json::JsonDuplicates;
    ///
    /// let map = DuplicateMap::new();
    /// let report = JsonDuplicates::new(&map, &CompareSummary::default(), ExitCode::NoDuplicates);
    /// assert!(report.to_json().unwrap().contains("\"PD002\""));
    /// ```
    #[must_use]
    pub fn new(map: &'a DuplicateMap, summary: &CompareSummary, exit_code: ExitCode) -> Self {
        Self {
            duplicates: map,
            summary: JsonSummary::new(summary, exit_code),
        }
    }
}

/// One validated image.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFile {
    /// Path as discovered
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Detected format
    pub format: &'static str,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

/// Validated file list report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonValidated {
    /// Number of images
    pub count: usize,
    /// Images in discovery order
    pub files: Vec<JsonFile>,
}

impl JsonValidated {
    /// Build the report.
    #[must_use]
    pub fn new(files: &[ValidatedFile]) -> Self {
        Self {
            count: files.len(),
            files: files
                .iter()
                .map(|f| JsonFile {
                    path: f.path.clone(),
                    size: f.size,
                    format: f.format_name(),
                    width: f.width,
                    height: f.height,
                })
                .collect(),
        }
    }
}

/// A failed transfer.
#[derive(Debug, Clone, Serialize)]
pub struct JsonFailure {
    /// The file
    pub path: PathBuf,
    /// Cause
    pub error: String,
}

/// Transfer result report.
#[derive(Debug, Serialize)]
pub struct JsonTransfer<'a> {
    /// move, delete or trash
    pub kind: TransferKind,
    /// Successful files, in input order
    pub succeeded: &'a [TransferRecord],
    /// Failed files, in input order
    pub failed: Vec<JsonFailure>,
    /// Bytes moved or removed
    pub bytes_transferred: u64,
    /// Process exit code
    pub exit_code: i32,
}

impl<'a> JsonTransfer<'a> {
    /// Build the report.
    #[must_use]
    pub fn new(result: &'a TransferResult, exit_code: ExitCode) -> Self {
        Self {
            kind: result.kind,
            succeeded: &result.successes,
            failed: result
                .failures
                .iter()
                .map(|f| JsonFailure {
                    path: f.path.clone(),
                    error: f.cause(),
                })
                .collect(),
            bytes_transferred: result.bytes_transferred,
            exit_code: exit_code.as_i32(),
        }
    }
}

macro_rules! impl_json_writer {
    ($($ty:ty),+) => {$(
        impl $ty {
            /// Serialize to compact JSON.
            ///
            /// # Errors
            ///
            /// Returns an error if serialization fails.
            pub fn to_json(&self) -> Result<String, serde_json::Error> {
                serde_json::to_string(self)
            }

            /// Serialize to pretty-printed JSON.
            ///
            /// # Errors
            ///
            /// Returns an error if serialization fails.
            pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
                serde_json::to_string_pretty(self)
            }

            /// Write JSON followed by a newline.
            ///
            /// # Errors
            ///
            /// Returns an error if serialization or writing fails.
            pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
                let json = if pretty { self.to_json_pretty()? } else { self.to_json()? };
                writer.write_all(json.as_bytes())?;
                writer.write_all(b"\n")?;
                Ok(())
            }
        }
    )+};
}

impl_json_writer!(JsonDuplicates<'_>, JsonValidated, JsonTransfer<'_>);
