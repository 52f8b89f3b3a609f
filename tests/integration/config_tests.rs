use std::env;
use std::fs;
use std::sync::Mutex;

use clap::Parser;
use picdupe::cli::{Cli, Commands};
use picdupe::config::{Config, ConfigError};
use picdupe::duplicates::PerceptualAlgorithm;
use picdupe::scanner::SignatureAlgorithm;
use tempfile::tempdir;

// Tests that read PICDUPE_* variables hold this while they run
static ENV_LOCK: Mutex<()> = Mutex::new(());

#[test]
fn test_file_overrides_defaults() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "recursive = true\nperceptual_algorithm = \"dhash\"\nsignature = \"blake3\"\nsimilarity_threshold = 3\n",
    )
    .unwrap();

    let config = Config::load(Some(&path), false).unwrap();
    assert!(config.recursive);
    assert_eq!(config.perceptual_algorithm, PerceptualAlgorithm::Dhash);
    assert_eq!(config.signature, SignatureAlgorithm::Blake3);
    assert_eq!(config.similarity_threshold, 3);
    assert_eq!(config.hash_size, Config::default().hash_size);
    assert!(config.pixel_by_pixel);
}

#[test]
fn test_environment_overrides_file() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "io_threads = 2\nhash_size = 16\n").unwrap();

    env::set_var("PICDUPE_IO_THREADS", "7");
    let loaded = Config::load(Some(&path), false);
    env::remove_var("PICDUPE_IO_THREADS");

    let config = loaded.unwrap();
    assert_eq!(config.io_threads, 7);
    assert_eq!(config.hash_size, 16);
}

#[test]
fn test_out_of_range_file_value_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "hash_size = 4\nsimilarity_threshold = 17\n").unwrap();

    match Config::load(Some(&path), false) {
        Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "similarity_threshold"),
        other => panic!("expected Invalid, got {other:?}"),
    }
}

#[test]
fn test_malformed_toml_is_rejected() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "recursive = [unclosed").unwrap();

    assert!(matches!(
        Config::load(Some(&path), false),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn test_saved_config_round_trips_through_load() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");
    let config = Config {
        max_depth: Some(3),
        perceptual_hash: false,
        move_destination: Some(dir.path().join("dupes")),
        permanent_delete: false,
        ..Config::default()
    };

    config.save(&path).unwrap();
    assert_eq!(Config::load(Some(&path), false).unwrap(), config);
}

#[test]
fn test_cli_flags_override_loaded_config() {
    let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "similarity_threshold = 5\nio_threads = 2\nskip_hidden = false\n").unwrap();

    let cli = Cli::try_parse_from([
        "picdupe",
        "compare",
        "photos",
        "--threshold",
        "1",
        "--no-pixel",
        "--skip-hidden",
    ])
    .unwrap();
    let Commands::Compare(args) = cli.command else {
        panic!("expected compare");
    };

    let mut config = Config::load(Some(&path), false).unwrap();
    args.scan.apply_to(&mut config);

    assert_eq!(config.similarity_threshold, 1);
    assert!(!config.pixel_by_pixel);
    assert!(config.skip_hidden);
    // Not given on the command line, so the file value stands
    assert_eq!(config.io_threads, 2);
    assert!(config.check().is_ok());
}
