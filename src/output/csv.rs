//! CSV reports for spreadsheets and data analysis.
//!
//! One row per file. Columns by report:
//!
//! - validated: `path,format,width,height,size`
//! - duplicates: `group_id,role,path,size` where `role` is `original` for the
//!   kept file and `duplicate` otherwise; `size` is empty if the file can no
//!   longer be read
//! - transfer: `status,path,destination,size,error`
//!
//! # Example
//!
//! ```no_run
//! use picdupe::duplicates::DuplicateMap;
//! use picdupe::output::csv::CsvOutput;
//!
//! let map = DuplicateMap::new();
//! CsvOutput::Duplicates(&map).write_to(std::io::stdout()).unwrap();
//! ```

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::actions::TransferResult;
use crate::duplicates::DuplicateMap;
use crate::scanner::ValidatedFile;

/// Errors that can occur during CSV output generation.
#[derive(Debug, Error)]
pub enum CsvOutputError {
    /// I/O error during writing.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Error during CSV serialization.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Serialize)]
struct ValidatedRow<'a> {
    path: String,
    format: &'a str,
    width: u32,
    height: u32,
    size: u64,
}

#[derive(Debug, Serialize)]
struct DuplicateRow {
    group_id: usize,
    role: &'static str,
    path: String,
    size: Option<u64>,
}

#[derive(Debug, Serialize)]
struct TransferRow {
    status: &'static str,
    path: String,
    destination: Option<String>,
    size: Option<u64>,
    error: Option<String>,
}

/// CSV renderer over one report.
#[derive(Debug, Clone, Copy)]
pub enum CsvOutput<'a> {
    /// Validated file list
    Validated(&'a [ValidatedFile]),
    /// Duplicate map
    Duplicates(&'a DuplicateMap),
    /// Transfer outcome
    Transfer(&'a TransferResult),
}

impl CsvOutput<'_> {
    /// Write header and rows to `writer`.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if writing or serialization fails.
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), CsvOutputError> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        match *self {
            Self::Validated(files) => {
                for file in files {
                    csv_writer.serialize(ValidatedRow {
                        path: file.path.to_string_lossy().into_owned(),
                        format: file.format_name(),
                        width: file.width,
                        height: file.height,
                        size: file.size,
                    })?;
                }
            }
            Self::Duplicates(map) => {
                for (idx, entry) in map.iter().enumerate() {
                    let group_id = idx + 1;
                    let roles = std::iter::once(("original", &entry.original))
                        .chain(entry.duplicates.iter().map(|p| ("duplicate", p)));
                    for (role, path) in roles {
                        csv_writer.serialize(DuplicateRow {
                            group_id,
                            role,
                            path: path.to_string_lossy().into_owned(),
                            size: file_size(path),
                        })?;
                    }
                }
            }
            Self::Transfer(result) => {
                for record in &result.successes {
                    csv_writer.serialize(TransferRow {
                        status: "ok",
                        path: record.source.to_string_lossy().into_owned(),
                        destination: record
                            .destination
                            .as_ref()
                            .map(|d| d.to_string_lossy().into_owned()),
                        size: Some(record.size),
                        error: None,
                    })?;
                }
                for failure in &result.failures {
                    csv_writer.serialize(TransferRow {
                        status: "failed",
                        path: failure.path.to_string_lossy().into_owned(),
                        destination: None,
                        size: None,
                        error: Some(failure.cause()),
                    })?;
                }
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Render to a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvOutputError` if serialization fails.
    pub fn to_csv_string(&self) -> Result<String, CsvOutputError> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn file_size(path: &Path) -> Option<u64> {
    fs::metadata(path).ok().map(|m| m.len())
}
