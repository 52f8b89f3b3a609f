//! picdupe - duplicate image finder
//!
//! Validates candidate files by content, buckets them by a cheap full-content
//! signature, refines each bucket through perceptual hashing and pixel-exact
//! comparison, then moves or deletes the confirmed duplicates while keeping
//! one file per class in place.

pub mod actions;
pub mod cli;
pub mod comparer;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

mod pool;

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::actions::{validate_preserves_originals, TransferResult};
use crate::cli::{Cli, Commands, OutputFormat, ScanArgs};
use crate::comparer::Comparer;
use crate::config::Config;
use crate::duplicates::{CompareSummary, DuplicateMap};
use crate::error::ExitCode;
use crate::output::{CsvOutput, JsonDuplicates, JsonTransfer, JsonValidated, TextOutput};
use crate::progress::Progress;
use crate::scanner::ValidatedFile;

/// Run the command described by `cli`.
///
/// # Errors
///
/// Returns any error that prevented the command from completing. Per-file
/// transfer failures are not errors; they are reported and reflected in the
/// returned exit code.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    logging::init_logging(cli.verbose, cli.quiet);

    let mut config = Config::load(cli.config.as_deref(), cli.portable)
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Config(ref args) => {
            print!("{}", config.to_toml()?);
            if args.save {
                let path = match cli.config {
                    Some(ref path) => path.clone(),
                    None => config::config_path(cli.portable)?,
                };
                config.save(&path)?;
            }
            Ok(ExitCode::Success)
        }
        Commands::Validate(ref args) => {
            let comparer = build_comparer(&cli, &mut config, &args.scan)?;
            let files = comparer
                .validate(&args.scan.paths)
                .context("Validation failed")?;
            report_validated(&files, args.output)?;
            Ok(ExitCode::Success)
        }
        Commands::Compare(ref args) => {
            let comparer = build_comparer(&cli, &mut config, &args.scan)?;
            let (map, summary) = find_duplicates(&comparer, &args.scan.paths)?;
            let code = if map.is_empty() {
                ExitCode::NoDuplicates
            } else {
                ExitCode::Success
            };
            report_duplicates(&map, &summary, args.output, code)?;
            Ok(code)
        }
        Commands::Move(ref args) => {
            if let Some(ref dir) = args.to {
                config.move_destination = Some(dir.clone());
            }
            let comparer = build_comparer(&cli, &mut config, &args.scan)?;
            let (map, _) = find_duplicates(&comparer, &args.scan.paths)?;
            if map.is_empty() {
                log::info!("No duplicates found, nothing to move");
                return Ok(ExitCode::NoDuplicates);
            }

            let selection = map.flatten();
            validate_preserves_originals(&selection, &map)?;
            let result = comparer
                .move_duplicates(&selection, None)
                .context("Move failed")?;
            finish_transfer(&result, args.output)
        }
        Commands::Delete(ref args) => {
            if !args.yes {
                bail!("Refusing to delete without --yes");
            }
            if args.trash {
                config.permanent_delete = false;
            }
            let comparer = build_comparer(&cli, &mut config, &args.scan)?;
            let (map, _) = find_duplicates(&comparer, &args.scan.paths)?;
            if map.is_empty() {
                log::info!("No duplicates found, nothing to delete");
                return Ok(ExitCode::NoDuplicates);
            }

            let selection = map.flatten();
            validate_preserves_originals(&selection, &map)?;
            let result = comparer.delete_duplicates(&selection);
            finish_transfer(&result, args.output)
        }
    }
}

fn build_comparer(cli: &Cli, config: &mut Config, scan: &ScanArgs) -> Result<Comparer> {
    scan.apply_to(config);
    config.check()?;
    log::debug!("Effective configuration: {:?}", config);

    let cancellation = signal::install_handler()?;
    let progress = Progress::new(cli.quiet || !io::stderr().is_terminal());

    Ok(Comparer::new(config)
        .with_shutdown_flag(cancellation.flag())
        .with_progress_callback(Arc::new(progress)))
}

fn find_duplicates(
    comparer: &Comparer,
    roots: &[PathBuf],
) -> Result<(DuplicateMap, CompareSummary)> {
    let files = comparer.validate(roots).context("Validation failed")?;
    log::info!("{} image(s) to compare", files.len());
    let result = comparer.compare(&files).context("Comparison failed")?;
    Ok(result)
}

fn finish_transfer(result: &TransferResult, format: OutputFormat) -> Result<ExitCode> {
    let code = if result.was_interrupted() {
        ExitCode::Interrupted
    } else if result.all_succeeded() {
        ExitCode::Success
    } else {
        ExitCode::PartialSuccess
    };
    report_transfer(result, format, code)?;
    Ok(code)
}

fn report_validated(files: &[ValidatedFile], format: OutputFormat) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Text => TextOutput::Validated(files).write_to(&mut stdout)?,
        OutputFormat::Json => JsonValidated::new(files).write_to(&mut stdout, true)?,
        OutputFormat::Csv => CsvOutput::Validated(files).write_to(&mut stdout)?,
    }
    stdout.flush()?;
    Ok(())
}

fn report_duplicates(
    map: &DuplicateMap,
    summary: &CompareSummary,
    format: OutputFormat,
    code: ExitCode,
) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Text => TextOutput::Duplicates(map, summary).write_to(&mut stdout)?,
        OutputFormat::Json => JsonDuplicates::new(map, summary, code).write_to(&mut stdout, true)?,
        OutputFormat::Csv => CsvOutput::Duplicates(map).write_to(&mut stdout)?,
    }
    stdout.flush()?;
    Ok(())
}

fn report_transfer(result: &TransferResult, format: OutputFormat, code: ExitCode) -> Result<()> {
    let mut stdout = io::stdout().lock();
    match format {
        OutputFormat::Text => TextOutput::Transfer(result).write_to(&mut stdout)?,
        OutputFormat::Json => JsonTransfer::new(result, code).write_to(&mut stdout, true)?,
        OutputFormat::Csv => CsvOutput::Transfer(result).write_to(&mut stdout)?,
    }
    stdout.flush()?;
    Ok(())
}
