//! Plain-text reports for terminals.

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::actions::TransferResult;
use crate::duplicates::{CompareSummary, DuplicateMap};
use crate::scanner::ValidatedFile;

/// Text renderer over one report.
#[derive(Debug, Clone, Copy)]
pub enum TextOutput<'a> {
    /// Validated file list
    Validated(&'a [ValidatedFile]),
    /// Duplicate map and the statistics of the run that produced it
    Duplicates(&'a DuplicateMap, &'a CompareSummary),
    /// Transfer outcome
    Transfer(&'a TransferResult),
}

impl TextOutput<'_> {
    /// Write the report.
    ///
    /// # Errors
    ///
    /// Propagates write failures.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match *self {
            Self::Validated(files) => write_validated(files, writer),
            Self::Duplicates(map, summary) => write_duplicates(map, summary, writer),
            Self::Transfer(result) => write_transfer(result, writer),
        }
    }

    /// Render to a string.
    #[must_use]
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        // Writing into a Vec cannot fail
        let _ = self.write_to(&mut buffer);
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

fn write_validated<W: Write>(files: &[ValidatedFile], w: &mut W) -> io::Result<()> {
    for file in files {
        writeln!(
            w,
            "{}  [{} {}x{}, {}]",
            file.path.display(),
            file.format_name(),
            file.width,
            file.height,
            ByteSize::b(file.size)
        )?;
    }
    writeln!(w, "{} image(s)", files.len())
}

fn write_duplicates<W: Write>(
    map: &DuplicateMap,
    summary: &CompareSummary,
    w: &mut W,
) -> io::Result<()> {
    if map.is_empty() {
        writeln!(w, "No duplicates found.")?;
    }
    for (idx, entry) in map.iter().enumerate() {
        writeln!(w, "[{}] {} (kept)", idx + 1, entry.original.display())?;
        for dup in &entry.duplicates {
            writeln!(w, "    {}", dup.display())?;
        }
    }
    writeln!(w)?;
    writeln!(
        w,
        "Compared {} file(s) in {} signature bucket(s): {} duplicate(s) in {} group(s)",
        summary.total_files, summary.buckets, summary.duplicate_files, summary.duplicate_groups
    )?;
    if summary.decode_failures > 0 {
        writeln!(
            w,
            "{} file(s) could not be decoded and were left out",
            summary.decode_failures
        )?;
    }
    writeln!(w, "Took {:.2}s", summary.duration.as_secs_f64())
}

fn write_transfer<W: Write>(result: &TransferResult, w: &mut W) -> io::Result<()> {
    for record in &result.successes {
        match record.destination {
            Some(ref dest) => writeln!(w, "{} -> {}", record.source.display(), dest.display())?,
            None => writeln!(w, "{}", record.source.display())?,
        }
    }
    for failure in &result.failures {
        writeln!(w, "FAILED {}: {}", failure.path.display(), failure.cause())?;
    }
    writeln!(w, "{}", result.summary())
}
