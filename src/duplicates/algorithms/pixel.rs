//! Pixel-exact stage.
//!
//! Two files match only if they decode to the same dimensions, the same
//! color type and identical sample bytes. Decoding costs O(pixels), so this
//! stage is meant for buckets that earlier stages have already narrowed.
//!
//! The stage works in two passes. First every file is decoded once and
//! summarised as a [`PixelFingerprint`] (dimensions, color type and a CRC32
//! of the samples). Files with different fingerprints cannot match. Then,
//! inside each fingerprint group, candidates are compared buffer against
//! buffer with the first unclaimed file acting as the anchor, so only two
//! decoded images are held at a time.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

use image::{ColorType, DynamicImage};
use rayon::prelude::*;

use super::{check_shutdown, decode_image, Algorithm, AlgorithmError, DecodeError, Partition};
use crate::scanner::ValidatedFile;

/// Cheap summary of a decoded pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFingerprint {
    /// Decoded width
    pub width: u32,
    /// Decoded height
    pub height: u32,
    /// Decoded color type
    pub color: ColorType,
    /// CRC32 over the raw sample bytes
    pub checksum: u32,
}

impl PixelFingerprint {
    /// Summarise a decoded image.
    #[must_use]
    pub fn of(img: &DynamicImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            color: img.color(),
            checksum: crc32fast::hash(img.as_bytes()),
        }
    }
}

/// Whether two decoded images are pixel-for-pixel identical.
#[must_use]
pub fn pixels_equal(a: &DynamicImage, b: &DynamicImage) -> bool {
    a.width() == b.width()
        && a.height() == b.height()
        && a.color() == b.color()
        && a.as_bytes() == b.as_bytes()
}

/// Requires exact equality of every decoded pixel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelExactStage;

impl PixelExactStage {
    /// Create the stage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Decode and fingerprint a single file.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if the image cannot be decoded.
    pub fn fingerprint(&self, file: &ValidatedFile) -> Result<PixelFingerprint, DecodeError> {
        decode_image(&file.path).map(|img| PixelFingerprint::of(&img))
    }

    /// Verify one fingerprint group, assigning labels to `positions`.
    ///
    /// Files that fail to decode here are left unlabelled.
    fn verify_group(
        files: &[ValidatedFile],
        positions: &[usize],
        shutdown: Option<&AtomicBool>,
    ) -> Result<Vec<(usize, Option<usize>)>, AlgorithmError> {
        let mut labels: HashMap<usize, Option<usize>> = HashMap::new();

        for (i, &anchor) in positions.iter().enumerate() {
            if labels.contains_key(&anchor) {
                continue;
            }
            check_shutdown(shutdown)?;

            let anchor_img = match decode_image(&files[anchor].path) {
                Ok(img) => img,
                Err(e) => {
                    log::warn!("Pixel stage skipping {}", e);
                    labels.insert(anchor, None);
                    continue;
                }
            };
            labels.insert(anchor, Some(anchor));

            for &candidate in &positions[i + 1..] {
                if labels.contains_key(&candidate) {
                    continue;
                }
                check_shutdown(shutdown)?;

                match decode_image(&files[candidate].path) {
                    Ok(img) if pixels_equal(&anchor_img, &img) => {
                        labels.insert(candidate, Some(anchor));
                    }
                    Ok(_) => {
                        log::debug!(
                            "Fingerprint collision: {} vs {}",
                            files[anchor].path.display(),
                            files[candidate].path.display()
                        );
                    }
                    Err(e) => {
                        log::warn!("Pixel stage skipping {}", e);
                        labels.insert(candidate, None);
                    }
                }
            }
        }

        Ok(positions
            .iter()
            .map(|p| (*p, labels.get(p).copied().flatten()))
            .collect())
    }
}

impl Algorithm for PixelExactStage {
    fn name(&self) -> &'static str {
        "pixel-exact"
    }

    fn partition(
        &self,
        files: &[ValidatedFile],
        shutdown: Option<&AtomicBool>,
    ) -> Result<Partition, AlgorithmError> {
        let fingerprints: Vec<Option<PixelFingerprint>> = files
            .par_iter()
            .map(|file| -> Result<Option<PixelFingerprint>, AlgorithmError> {
                check_shutdown(shutdown)?;
                match self.fingerprint(file) {
                    Ok(fp) => Ok(Some(fp)),
                    Err(e) => {
                        log::warn!("Pixel stage skipping {}", e);
                        Ok(None)
                    }
                }
            })
            .collect::<Result<_, AlgorithmError>>()?;

        // Positions per fingerprint, in input order
        let mut groups: Vec<Vec<usize>> = Vec::new();
        let mut slots: HashMap<PixelFingerprint, usize> = HashMap::new();
        for (position, fingerprint) in fingerprints.iter().enumerate() {
            if let Some(fp) = fingerprint {
                let slot = *slots.entry(*fp).or_insert_with(|| {
                    groups.push(Vec::new());
                    groups.len() - 1
                });
                groups[slot].push(position);
            }
        }

        let mut labels: Vec<Option<usize>> = vec![None; files.len()];
        let verified: Vec<Vec<(usize, Option<usize>)>> = groups
            .par_iter()
            .map(|positions| {
                if positions.len() == 1 {
                    Ok(vec![(positions[0], Some(positions[0]))])
                } else {
                    Self::verify_group(files, positions, shutdown)
                }
            })
            .collect::<Result<_, AlgorithmError>>()?;
        for (position, label) in verified.into_iter().flatten() {
            labels[position] = label;
        }

        let partition = Partition::from_labels(files, &labels);
        log::debug!(
            "{} stage: {} file(s) -> {} class(es), {} excluded",
            self.name(),
            files.len(),
            partition.classes.len(),
            partition.excluded.len()
        );
        Ok(partition)
    }
}
