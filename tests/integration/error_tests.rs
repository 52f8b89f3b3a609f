use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use picdupe::actions::TransferError;
use picdupe::cli::Cli;
use picdupe::duplicates::ProcessorError;
use picdupe::error::{is_interrupted, ExitCode, StructuredError};
use picdupe::scanner::ValidateError;
use tempfile::{tempdir, TempDir};

use super::common::{checkerboard, write_distinct_pngs, write_png};

/// Run the app against an empty config file so user settings stay out.
fn run(config_dir: &TempDir, args: &[&str]) -> anyhow::Result<ExitCode> {
    let config = config_dir.path().join("config.toml");
    if !config.exists() {
        fs::write(&config, "").unwrap();
    }
    let config = config.to_string_lossy().into_owned();

    let mut argv = vec!["picdupe", "--quiet", "--config", config.as_str()];
    argv.extend_from_slice(args);
    picdupe::run_app(Cli::try_parse_from(argv).unwrap())
}

fn arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn dir_with_one_duplicate() -> (TempDir, PathBuf, PathBuf) {
    let dir = tempdir().unwrap();
    let keep = write_png(dir.path(), "a.png", &checkerboard(32, 4));
    let dup = dir.path().join("b.png");
    fs::copy(&keep, &dup).unwrap();
    (dir, keep, dup)
}

#[test]
fn test_compare_exit_codes() {
    let config = tempdir().unwrap();
    let (dir, _, _) = dir_with_one_duplicate();
    let code = run(&config, &["compare", &arg(dir.path())]).unwrap();
    assert_eq!(code, ExitCode::Success);

    let unique = tempdir().unwrap();
    write_distinct_pngs(unique.path(), "img", 3);
    let code = run(&config, &["compare", &arg(unique.path()), "--output", "json"]).unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
}

#[test]
fn test_missing_path_is_general_error() {
    let config = tempdir().unwrap();
    let missing = config.path().join("nowhere");

    let err = run(&config, &["validate", &arg(&missing)]).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(matches!(
        err.downcast_ref::<ValidateError>(),
        Some(ValidateError::NotFound(_))
    ));

    let structured = StructuredError::new(&err, ExitCode::GeneralError);
    assert_eq!(structured.code, "PD001");
    assert_eq!(structured.exit_code, 1);
    assert!(structured.message.starts_with("Validation failed: "));
    assert!(!structured.interrupted);
}

#[test]
fn test_move_and_delete_through_app() {
    let config = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let (dir, keep, dup) = dir_with_one_duplicate();

    let code = run(
        &config,
        &["move", &arg(dir.path()), "--to", &arg(dest.path()), "--output", "csv"],
    )
    .unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(keep.exists());
    assert!(!dup.exists());
    assert!(dest.path().join("b.png").exists());

    // The pair is gone, so nothing is left to delete
    let code = run(&config, &["delete", &arg(dir.path()), "--yes"]).unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
}

#[test]
fn test_delete_never_removes_a_file_named_twice() {
    let config = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let only = write_png(dir.path(), "a.png", &checkerboard(32, 4));
    fs::create_dir(dir.path().join("sub")).unwrap();
    let alias = dir.path().join("sub").join("..");

    let code = run(&config, &["delete", &arg(dir.path()), &arg(&alias), "--yes"]).unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
    assert!(only.exists());

    let code = run(
        &config,
        &["delete", &arg(&only), &arg(&alias.join("a.png")), "--yes"],
    )
    .unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
    assert!(only.exists());
}

#[test]
fn test_delete_with_aliased_roots_keeps_the_original() {
    let config = tempdir().unwrap();
    let (dir, keep, dup) = dir_with_one_duplicate();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let alias = dir.path().join("sub").join("..");

    let code = run(&config, &["delete", &arg(&alias), &arg(dir.path()), "--yes"]).unwrap();
    assert_eq!(code, ExitCode::Success);

    assert!(keep.exists());
    assert!(!dup.exists());
}

#[cfg(unix)]
#[test]
fn test_hardlinked_copy_is_not_deleted() {
    let config = tempdir().unwrap();
    let dir = tempdir().unwrap();
    let only = write_png(dir.path(), "a.png", &checkerboard(32, 4));
    let link = dir.path().join("b.png");
    fs::hard_link(&only, &link).unwrap();

    let code = run(&config, &["delete", &arg(dir.path()), "--yes"]).unwrap();
    assert_eq!(code, ExitCode::NoDuplicates);
    assert!(only.exists() && link.exists());
}

#[test]
fn test_delete_requires_confirmation() {
    let config = tempdir().unwrap();
    let (dir, keep, dup) = dir_with_one_duplicate();

    let err = run(&config, &["delete", &arg(dir.path())]).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(keep.exists() && dup.exists());

    let code = run(&config, &["delete", &arg(dir.path()), "-y"]).unwrap();
    assert_eq!(code, ExitCode::Success);
    assert!(keep.exists());
    assert!(!dup.exists());
}

#[test]
fn test_move_to_invalid_destination_is_fatal() {
    let config = tempdir().unwrap();
    let (dir, keep, dup) = dir_with_one_duplicate();
    let missing = dir.path().join("missing");

    let err = run(&config, &["move", &arg(dir.path()), "--to", &arg(&missing)]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<TransferError>(),
        Some(TransferError::InvalidDestination(_))
    ));
    assert!(keep.exists() && dup.exists());
}

#[test]
fn test_bad_config_value_is_general_error() {
    let config = tempdir().unwrap();
    fs::write(config.path().join("config.toml"), "io_threads = 0\n").unwrap();
    let dir = tempdir().unwrap();

    let err = run(&config, &["validate", &arg(dir.path())]).unwrap_err();
    assert_eq!(ExitCode::for_error(&err), ExitCode::GeneralError);
    assert!(format!("{err:#}").contains("io_threads"));
}

#[test]
fn test_interruption_is_found_through_context() {
    let cases: Vec<anyhow::Error> = vec![
        anyhow::Error::new(ValidateError::Interrupted).context("Validation failed"),
        Err::<(), _>(ProcessorError::Interrupted)
            .context("Comparison failed")
            .unwrap_err(),
        anyhow::Error::new(TransferError::Interrupted(PathBuf::from("/x.png"))),
    ];

    for err in &cases {
        assert!(is_interrupted(err), "{err:#}");
        assert_eq!(ExitCode::for_error(err), ExitCode::Interrupted);
        let structured = StructuredError::new(err, ExitCode::for_error(err));
        assert_eq!(structured.code, "PD130");
        assert!(structured.interrupted);
    }

    let other = anyhow::Error::new(TransferError::NotFound(PathBuf::from("/x.png")));
    assert!(!is_interrupted(&other));
}
