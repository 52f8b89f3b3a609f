use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use picdupe::actions::{validate_preserves_originals, TransferError, TransferKind};
use picdupe::comparer::Comparer;
use picdupe::config::Config;
use picdupe::duplicates::DuplicateMap;
use tempfile::tempdir;

use super::common::{checkerboard, write_distinct_pngs, write_png};

#[test]
fn test_move_with_one_vanished_file() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let files = write_distinct_pngs(src.path(), "dup", 5);
    fs::remove_file(&files[2]).unwrap();

    let result = Comparer::new(&Config::default())
        .move_duplicates(&files, Some(dest.path()))
        .unwrap();

    assert_eq!(result.kind, TransferKind::Move);
    assert_eq!(result.success_count(), 4);
    assert_eq!(result.failure_count(), 1);
    assert_eq!(result.failures[0].path, files[2]);
    assert!(matches!(
        result.failures[0].error,
        TransferError::NotFound(_)
    ));

    for (i, path) in files.iter().enumerate() {
        assert!(!path.exists());
        let moved = dest.path().join(path.file_name().unwrap());
        assert_eq!(moved.exists(), i != 2);
    }
    let sources: Vec<&PathBuf> = result.successes.iter().map(|r| &r.source).collect();
    assert_eq!(sources, vec![&files[0], &files[1], &files[3], &files[4]]);
}

#[cfg(unix)]
#[test]
fn test_move_with_one_locked_file() {
    use std::os::unix::fs::PermissionsExt;

    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let locked = src.path().join("locked");
    fs::create_dir(&locked).unwrap();

    let mut files = write_distinct_pngs(src.path(), "dup", 4);
    let stuck = write_png(&locked, "dup99.png", &checkerboard(32, 9));
    files.insert(2, stuck.clone());

    // Read and search only: the file is visible but cannot be unlinked
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o500)).unwrap();
    let canary = locked.join("writable");
    if fs::write(&canary, b"").is_ok() {
        // Privileged users ignore the mode; nothing to check then
        fs::remove_file(&canary).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = Comparer::new(&Config::default()).move_duplicates(&files, Some(dest.path()));
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    let result = result.unwrap();

    assert_eq!(result.success_count(), 4);
    assert_eq!(result.failure_count(), 1);
    assert_eq!(result.failures[0].path, stuck);
    assert!(matches!(
        result.failures[0].error,
        TransferError::PermissionDenied(_)
    ));

    assert!(stuck.exists());
    assert!(!dest.path().join("dup99.png").exists());
    for (i, path) in files.iter().enumerate().filter(|(i, _)| *i != 2) {
        assert!(!path.exists(), "file #{i} was not moved");
        assert!(dest.path().join(path.file_name().unwrap()).exists());
    }
}

#[test]
fn test_move_to_missing_destination_touches_nothing() {
    let src = tempdir().unwrap();
    let files = write_distinct_pngs(src.path(), "dup", 3);
    let missing = src.path().join("no_such_dir");

    let result = Comparer::new(&Config::default()).move_duplicates(&files, Some(&missing));

    assert!(matches!(result, Err(TransferError::InvalidDestination(p)) if p == missing));
    assert!(files.iter().all(|p| p.exists()));
}

#[test]
fn test_move_to_file_destination_is_rejected() {
    let src = tempdir().unwrap();
    let files = write_distinct_pngs(src.path(), "dup", 2);

    let result = Comparer::new(&Config::default()).move_duplicates(&files[..1], Some(&files[1]));

    assert!(matches!(result, Err(TransferError::InvalidDestination(_))));
    assert!(files[0].exists());
}

#[test]
fn test_move_uses_configured_destination() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let files = write_distinct_pngs(src.path(), "dup", 2);

    let config = Config {
        move_destination: Some(dest.path().to_path_buf()),
        ..Config::default()
    };
    let result = Comparer::new(&config).move_duplicates(&files, None).unwrap();

    assert!(result.all_succeeded());
    assert!(dest.path().join("dup00.png").exists());
    assert!(dest.path().join("dup01.png").exists());
}

#[test]
fn test_same_name_collision_last_write_wins() {
    let root = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let first_dir = root.path().join("first");
    let second_dir = root.path().join("second");
    fs::create_dir(&first_dir).unwrap();
    fs::create_dir(&second_dir).unwrap();

    let first = write_png(&first_dir, "photo.png", &checkerboard(16, 2));
    let second = write_png(&second_dir, "photo.png", &checkerboard(16, 4));
    let expected = fs::read(&second).unwrap();

    let result = Comparer::new(&Config::default())
        .move_duplicates(&[first.clone(), second.clone()], Some(dest.path()))
        .unwrap();

    assert_eq!(result.success_count(), 2);
    assert!(!first.exists());
    assert!(!second.exists());
    assert_eq!(fs::read(dest.path().join("photo.png")).unwrap(), expected);
}

#[test]
fn test_move_into_own_directory_is_noop() {
    let dir = tempdir().unwrap();
    let files = write_distinct_pngs(dir.path(), "dup", 1);

    let result = Comparer::new(&Config::default())
        .move_duplicates(&files, Some(dir.path()))
        .unwrap();

    assert!(result.all_succeeded());
    assert!(files[0].exists());
}

#[test]
fn test_cancelled_move_records_every_file() {
    let src = tempdir().unwrap();
    let dest = tempdir().unwrap();
    let files = write_distinct_pngs(src.path(), "dup", 3);

    let flag = Arc::new(AtomicBool::new(true));
    let result = Comparer::new(&Config::default())
        .with_shutdown_flag(flag)
        .move_duplicates(&files, Some(dest.path()))
        .unwrap();

    assert_eq!(result.failure_count(), 3);
    assert!(result.was_interrupted());
    assert!(files.iter().all(|p| p.exists()));
}

#[test]
fn test_permanent_delete_after_compare() {
    let dir = tempdir().unwrap();
    let keep = write_png(dir.path(), "a.png", &checkerboard(32, 4));
    let dup = dir.path().join("b.png");
    fs::copy(&keep, &dup).unwrap();

    let comparer = Comparer::new(&Config::default());
    let files = comparer.validate(&[dir.path().to_path_buf()]).unwrap();
    let (map, _) = comparer.compare(&files).unwrap();

    let selection = map.flatten();
    validate_preserves_originals(&selection, &map).unwrap();
    let result = comparer.delete_duplicates(&selection);

    assert_eq!(result.kind, TransferKind::Delete);
    assert!(result.all_succeeded());
    assert!(keep.exists());
    assert!(!dup.exists());
    assert_eq!(result.bytes_transferred, fs::metadata(&keep).unwrap().len());
}

#[test]
fn test_delete_reports_missing_file() {
    let dir = tempdir().unwrap();
    let files = write_distinct_pngs(dir.path(), "dup", 2);
    let ghost = dir.path().join("ghost.png");

    let selection = vec![files[0].clone(), ghost.clone(), files[1].clone()];
    let result = Comparer::new(&Config::default()).delete_duplicates(&selection);

    assert_eq!(result.success_count(), 2);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].path, ghost);
    assert!(!files[0].exists() && !files[1].exists());
}

#[test]
fn test_selection_with_original_is_refused() {
    let dir = tempdir().unwrap();
    let keep = write_png(dir.path(), "a.png", &checkerboard(32, 4));
    fs::copy(&keep, dir.path().join("b.png")).unwrap();

    let comparer = Comparer::new(&Config::default());
    let files = comparer.validate(&[dir.path().to_path_buf()]).unwrap();
    let (map, _) = comparer.compare(&files).unwrap();

    let mut selection = map.flatten();
    selection.push(keep.clone());
    let err = validate_preserves_originals(&selection, &map).unwrap_err();
    assert!(matches!(err, TransferError::OriginalSelected(p) if p == keep));
}

#[test]
fn test_original_under_another_name_is_refused() {
    let dir = tempdir().unwrap();
    let keep = write_png(dir.path(), "a.png", &checkerboard(32, 4));
    let dup = dir.path().join("b.png");
    fs::copy(&keep, &dup).unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    let alias = dir.path().join("sub").join("..").join("a.png");

    let mut map = DuplicateMap::new();
    map.insert(alias.clone(), vec![dup.clone()]);

    let err = validate_preserves_originals(&[dup.clone(), keep.clone()], &map).unwrap_err();
    assert!(matches!(err, TransferError::OriginalSelected(p) if p == keep));

    let mut map = DuplicateMap::new();
    map.insert(keep.clone(), vec![alias.clone()]);
    let err = validate_preserves_originals(&map.flatten(), &map).unwrap_err();
    assert!(matches!(err, TransferError::OriginalSelected(p) if p == alias));

    assert!(keep.exists() && dup.exists());
}
