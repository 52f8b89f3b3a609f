//! Report renderers.
//!
//! Every command produces one of three reports: the validated file list, a
//! duplicate map with its [`CompareSummary`](crate::duplicates::CompareSummary),
//! or a transfer result. Each has a renderer per output format:
//! - [`text`] for terminals
//! - [`json`] for automation and scripting
//! - [`csv`] for spreadsheet import
//!
//! # Example
//!
//! ```no_run
//! use picdupe::comparer::Comparer;
//! use picdupe::config::Config;
//! use picdupe::error::ExitCode;
//! use picdupe::output::json::JsonDuplicates;
//! use std::path::PathBuf;
//!
//! let comparer = Comparer::new(&Config::default());
//! let files = comparer.validate(&[PathBuf::from("./photos")]).unwrap();
//! let (map, summary) = comparer.compare(&files).unwrap();
//!
//! let report = JsonDuplicates::new(&map, &summary, ExitCode::Success);
//! println!("{}", report.to_json_pretty().unwrap());
//! ```

pub mod csv;
pub mod json;
pub mod text;

// Re-export main types
pub use self::csv::{CsvOutput, CsvOutputError};
pub use self::json::{JsonDuplicates, JsonOutputError, JsonTransfer, JsonValidated};
pub use self::text::TextOutput;
