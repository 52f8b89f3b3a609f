//! Command-line interface definitions for picdupe.
//!
//! Global options (verbosity, config location, error format) come first,
//! followed by one subcommand per pipeline operation.
//!
//! # Example
//!
//! ```bash
//! # List the images picdupe would consider
//! picdupe validate ~/Pictures -r
//!
//! # Report duplicates as JSON
//! picdupe compare ~/Pictures --output json
//!
//! # Move duplicates aside, keeping one file per class in place
//! picdupe move ~/Pictures --to ~/Pictures/dupes
//!
//! # Tolerant perceptual matching, no pixel check
//! picdupe compare ~/Pictures --threshold 8 --no-pixel
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::duplicates::PerceptualAlgorithm;
use crate::scanner::SignatureAlgorithm;

/// Duplicate image finder.
///
/// Images are grouped by a cheap content signature, then refined by
/// perceptual hashing and pixel-exact comparison. One file per duplicate
/// class is kept; the rest can be listed, moved or deleted.
#[derive(Debug, Parser)]
#[command(name = "picdupe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Print errors as a JSON object on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file to use instead of the default location
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Keep configuration in ./config instead of the user config directory
    #[arg(long, global = true, env = "PICDUPE_PORTABLE")]
    pub portable: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the files that pass image validation
    Validate(ValidateArgs),
    /// Find duplicate images and print the duplicate map
    Compare(CompareArgs),
    /// Find duplicates and move them into a directory
    Move(MoveArgs),
    /// Find duplicates and delete them
    Delete(DeleteArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

/// Input paths and the flags that shape validation and comparison.
#[derive(Debug, Clone, Args)]
pub struct ScanArgs {
    /// Files and directories to examine
    #[arg(value_name = "PATH", required = true)]
    pub paths: Vec<PathBuf>,

    /// Descend into sub-directories without limit
    #[arg(short, long)]
    pub recursive: bool,

    /// Maximum directory depth (overrides --recursive)
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Skip the perceptual-hash stage
    #[arg(long)]
    pub no_perceptual: bool,

    /// Skip the pixel-by-pixel stage
    #[arg(long)]
    pub no_pixel: bool,

    /// Perceptual hash algorithm
    #[arg(long, value_enum, value_name = "ALG")]
    pub algorithm: Option<PerceptualAlgorithm>,

    /// Maximum Hamming distance between perceptual hashes (0 = identical hashes)
    #[arg(long, value_name = "BITS")]
    pub threshold: Option<u32>,

    /// Perceptual hash side length in bits
    #[arg(long, value_name = "N")]
    pub hash_size: Option<u32>,

    /// Coarse content signature
    #[arg(long, value_enum, value_name = "ALG")]
    pub signature: Option<SignatureAlgorithm>,

    /// Number of worker threads
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// Follow symbolic links during expansion
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long)]
    pub skip_hidden: bool,
}

impl ScanArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply_to(&self, config: &mut Config) {
        if self.recursive {
            config.recursive = true;
        }
        if let Some(depth) = self.max_depth {
            config.max_depth = Some(depth);
        }
        if self.no_perceptual {
            config.perceptual_hash = false;
        }
        if self.no_pixel {
            config.pixel_by_pixel = false;
        }
        if let Some(algorithm) = self.algorithm {
            config.perceptual_algorithm = algorithm;
        }
        if let Some(threshold) = self.threshold {
            config.similarity_threshold = threshold;
        }
        if let Some(size) = self.hash_size {
            config.hash_size = size;
        }
        if let Some(signature) = self.signature {
            config.signature = signature;
        }
        if let Some(threads) = self.io_threads {
            config.io_threads = threads;
        }
        if self.follow_symlinks {
            config.follow_symlinks = true;
        }
        if self.skip_hidden {
            config.skip_hidden = true;
        }
    }
}

/// Arguments for the validate subcommand.
#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the compare subcommand.
#[derive(Debug, Args)]
pub struct CompareArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the move subcommand.
#[derive(Debug, Args)]
pub struct MoveArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Destination directory (default: configured destination, else the working directory)
    #[arg(long, value_name = "DIR")]
    pub to: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the delete subcommand.
#[derive(Debug, Args)]
pub struct DeleteArgs {
    #[command(flatten)]
    pub scan: ScanArgs,

    /// Send files to the system trash instead of deleting them permanently
    #[arg(long)]
    pub trash: bool,

    /// Confirm deletion (required)
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

/// Arguments for the config subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Write the effective configuration to the config file
    #[arg(long)]
    pub save: bool,
}

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for scripting
    Json,
    /// CSV for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
