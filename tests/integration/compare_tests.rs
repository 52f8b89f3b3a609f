use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use picdupe::comparer::Comparer;
use picdupe::config::Config;
use picdupe::duplicates::{
    DuplicateMap, DuplicateProcessor, PerceptualAlgorithm, PerceptualStage, PixelExactStage,
    ProcessorConfig, ProcessorError,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::tempdir;

use super::common::{checkerboard, force_crc32, write_bmp, write_png};

fn compare_dir(config: &Config, dir: &Path) -> DuplicateMap {
    let comparer = Comparer::new(config);
    let files = comparer.validate(&[dir.to_path_buf()]).unwrap();
    comparer.compare(&files).unwrap().0
}

#[test]
fn test_identical_pair_and_unique_image() {
    let dir = tempdir().unwrap();
    let img1 = write_png(dir.path(), "img1.png", &checkerboard(32, 4));
    let copy = dir.path().join("img1_copy.png");
    fs::copy(&img1, &copy).unwrap();
    let img2 = write_png(dir.path(), "img2.png", &checkerboard(32, 8));

    let comparer = Comparer::new(&Config::default());
    let files = comparer.validate(&[dir.path().to_path_buf()]).unwrap();
    let (map, summary) = comparer.compare(&files).unwrap();

    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&img1), Some(&[copy.clone()][..]));
    assert!(!map.contains(&img2));
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.buckets, 2);
    assert_eq!(summary.duplicate_groups, 1);
    assert_eq!(summary.duplicate_files, 1);
    assert_eq!(map.flatten(), vec![copy]);
}

#[test]
fn test_representative_follows_input_order() {
    let dir = tempdir().unwrap();
    let a = write_png(dir.path(), "a.png", &checkerboard(32, 4));
    let b = dir.path().join("b.png");
    fs::copy(&a, &b).unwrap();

    let comparer = Comparer::new(&Config::default());
    let files = comparer.validate(&[b.clone(), a.clone()]).unwrap();
    let (map, _) = comparer.compare(&files).unwrap();

    assert_eq!(map.get(&b), Some(&[a][..]));
}

#[test]
fn test_checksum_collision_rejected_by_pixel_stage() {
    let dir = tempdir().unwrap();
    let first = write_bmp(dir.path(), "first.bmp", &checkerboard(16, 2));
    let second = write_bmp(dir.path(), "second.bmp", &checkerboard(16, 4));
    force_crc32(&second, crc32fast::hash(&fs::read(&first).unwrap()));

    // Signature only: the collision lands both files in one class
    let config = Config {
        perceptual_hash: false,
        pixel_by_pixel: false,
        ..Config::default()
    };
    assert_eq!(compare_dir(&config, dir.path()).len(), 1);

    // Pixel-exact refinement sees different pixels
    let config = Config {
        perceptual_hash: false,
        ..Config::default()
    };
    assert!(compare_dir(&config, dir.path()).is_empty());
}

#[test]
fn test_same_pixels_different_encodings() {
    let dir = tempdir().unwrap();
    let img = checkerboard(16, 2);
    write_png(dir.path(), "a.png", &img);
    write_bmp(dir.path(), "b.bmp", &img);

    // Different bytes, so the coarse grouper keeps them apart
    let map = compare_dir(&Config::default(), dir.path());
    assert!(map.is_empty());
}

#[test]
fn test_one_pixel_difference_survives_perceptual_but_not_pixel() {
    let dir = tempdir().unwrap();
    let base = checkerboard(64, 8);
    let mut tweaked = base.clone();
    let Rgb([r, g, b]) = *tweaked.get_pixel(0, 0);
    tweaked.put_pixel(0, 0, Rgb([r + 1, g, b]));
    let a = write_png(dir.path(), "a.png", &base);
    let t = write_png(dir.path(), "t.png", &tweaked);

    let files = Comparer::new(&Config::default())
        .validate(&[dir.path().to_path_buf()])
        .unwrap();
    let bucket: Vec<_> = files
        .iter()
        .filter(|f| f.path == a || f.path == t)
        .cloned()
        .collect();

    let perceptual_only = DuplicateProcessor::new(
        ProcessorConfig::default(),
        vec![Box::new(
            PerceptualStage::new(PerceptualAlgorithm::Phash).with_threshold(4),
        )],
    );
    assert_eq!(perceptual_only.refine(&bucket).unwrap().classes.len(), 1);

    let with_pixel = DuplicateProcessor::new(
        ProcessorConfig::default(),
        vec![
            Box::new(PerceptualStage::new(PerceptualAlgorithm::Phash).with_threshold(4)),
            Box::new(PixelExactStage::new()),
        ],
    );
    assert!(with_pixel.refine(&bucket).unwrap().classes.is_empty());
}

#[test]
fn test_compare_is_idempotent() {
    let dir = tempdir().unwrap();
    for (i, cell) in [2u32, 2, 4, 4, 4, 8].iter().enumerate() {
        write_png(dir.path(), &format!("img{i}.png"), &checkerboard(32, *cell));
    }

    let comparer = Comparer::new(&Config::default());
    let files = comparer.validate(&[dir.path().to_path_buf()]).unwrap();
    let (first, _) = comparer.compare(&files).unwrap();
    let (second, _) = comparer.compare(&files).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(first.duplicate_count(), 3);
}

#[test]
fn test_vanished_file_fails_comparison() {
    let dir = tempdir().unwrap();
    let a = write_png(dir.path(), "a.png", &checkerboard(16, 2));
    write_png(dir.path(), "b.png", &checkerboard(16, 4));

    let comparer = Comparer::new(&Config::default());
    let files = comparer.validate(&[dir.path().to_path_buf()]).unwrap();
    fs::remove_file(&a).unwrap();

    assert!(matches!(
        comparer.compare(&files),
        Err(ProcessorError::Signature(_))
    ));
}

#[test]
fn test_cancelled_comparison() {
    let dir = tempdir().unwrap();
    write_png(dir.path(), "a.png", &checkerboard(16, 2));

    let flag = Arc::new(AtomicBool::new(false));
    let comparer = Comparer::new(&Config::default()).with_shutdown_flag(Arc::clone(&flag));
    let files = comparer.validate(&[dir.path().to_path_buf()]).unwrap();

    flag.store(true, Ordering::SeqCst);
    assert!(matches!(
        comparer.compare(&files),
        Err(ProcessorError::Interrupted)
    ));
}

#[test]
fn test_corrupt_image_in_bucket_is_not_fatal() {
    let dir = tempdir().unwrap();
    // Noisy pixels keep the compressed data far longer than the header
    let img = RgbImage::from_fn(64, 64, |x, y| {
        let v = (x * 37 + y * 91) ^ (x * y);
        Rgb([v as u8, (v >> 3) as u8, (x ^ y) as u8])
    });
    let a = write_png(dir.path(), "a.png", &img);
    let bytes = fs::read(&a).unwrap();
    assert!(bytes.len() > 1024);
    // Header intact, pixel data cut: validates, fails to decode
    let truncated: PathBuf = dir.path().join("x_truncated.png");
    fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();
    let truncated_copy = dir.path().join("y_truncated.png");
    fs::copy(&truncated, &truncated_copy).unwrap();

    let comparer = Comparer::new(&Config::default());
    let files = comparer.validate(&[dir.path().to_path_buf()]).unwrap();
    let (map, summary) = comparer.compare(&files).unwrap();

    assert!(files.iter().any(|f| f.path == truncated));
    assert!(files.iter().any(|f| f.path == truncated_copy));
    assert!(map.is_empty());
    assert_eq!(summary.decode_failures, 2);
}
