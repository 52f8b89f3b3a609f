//! Content-based image predicate.
//!
//! A file is accepted when its leading bytes match a known image signature
//! *and* the header for that format can be decoded. Extensions are never
//! consulted, so a renamed PNG is still found and a `.jpg` full of text is not.

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

use image::{ImageFormat, ImageReader};

/// Header information gathered while sniffing a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageInfo {
    /// Detected container format
    pub format: ImageFormat,
    /// Pixel width
    pub width: u32,
    /// Pixel height
    pub height: u32,
    /// File size in bytes
    pub size: u64,
}

/// Sniff a file and report whether it is a supported image.
///
/// Returns `Ok(None)` for files that are readable but are not images (or are
/// images in a format this build cannot decode).
///
/// # Errors
///
/// Returns the I/O error if the file cannot be opened or read at all.
pub fn sniff_image(path: &Path) -> io::Result<Option<ImageInfo>> {
    let file = File::open(path)?;
    let size = file.metadata()?.len();

    if size == 0 {
        log::trace!("Empty file is not an image: {}", path.display());
        return Ok(None);
    }

    let reader = ImageReader::new(BufReader::new(file)).with_guessed_format()?;
    let Some(format) = reader.format() else {
        log::trace!("No image signature: {}", path.display());
        return Ok(None);
    };

    match reader.into_dimensions() {
        Ok((width, height)) => Ok(Some(ImageInfo {
            format,
            width,
            height,
            size,
        })),
        Err(e) => {
            log::debug!(
                "Rejecting {} ({:?} signature, header unreadable): {}",
                path.display(),
                format,
                e
            );
            Ok(None)
        }
    }
}
