use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};

/// Checkerboard with `cell`-pixel squares; different cells give different
/// pixels, bytes and perceptual hashes.
pub fn checkerboard(size: u32, cell: u32) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        if ((x / cell) + (y / cell)) % 2 == 0 {
            Rgb([20, 20, 20])
        } else {
            Rgb([230, 230, 230])
        }
    })
}

pub fn write_png(dir: &Path, name: &str, img: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    img.save_with_format(&path, ImageFormat::Png).unwrap();
    path
}

pub fn write_bmp(dir: &Path, name: &str, img: &RgbImage) -> PathBuf {
    let path = dir.join(name);
    img.save_with_format(&path, ImageFormat::Bmp).unwrap();
    path
}

/// `count` distinct PNGs named `{prefix}{i}.png`.
pub fn write_distinct_pngs(dir: &Path, prefix: &str, count: u32) -> Vec<PathBuf> {
    (0..count)
        .map(|i| write_png(dir, &format!("{prefix}{i:02}.png"), &checkerboard(32, i + 1)))
        .collect()
}

fn crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let mut c = i as u32;
        for _ in 0..8 {
            c = if c & 1 != 0 { 0xEDB8_8320 ^ (c >> 1) } else { c >> 1 };
        }
        *slot = c;
    }
    table
}

/// Append four bytes to `path` so its CRC32 becomes `target`.
///
/// Trailing bytes after the pixel array are ignored by the BMP decoder, so
/// the image still decodes to the same pixels.
pub fn force_crc32(path: &Path, target: u32) {
    let table = crc_table();
    let mut data = fs::read(path).unwrap();

    let mut reg = target ^ 0xFFFF_FFFF;
    let mut indices = [0u8; 4];
    for slot in indices.iter_mut().rev() {
        let top = reg >> 24;
        let index = (0..256).find(|&i| table[i] >> 24 == top).unwrap();
        *slot = index as u8;
        reg = (reg ^ table[index]) << 8;
    }

    let mut reg = crc32fast::hash(&data) ^ 0xFFFF_FFFF;
    for &index in &indices {
        data.push((reg as u8) ^ index);
        reg = (reg >> 8) ^ table[index as usize];
    }

    assert_eq!(crc32fast::hash(&data), target, "CRC forging failed");
    fs::write(path, data).unwrap();
}
