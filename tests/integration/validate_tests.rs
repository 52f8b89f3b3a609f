use std::fs;
use std::path::PathBuf;

use picdupe::comparer::Comparer;
use picdupe::config::Config;
use picdupe::scanner::ValidateError;
use tempfile::tempdir;

use super::common::{checkerboard, write_distinct_pngs, write_png};

#[test]
fn test_depth_one_ignores_nested_directory() {
    let dir = tempdir().unwrap();
    write_distinct_pngs(dir.path(), "top", 10);
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).unwrap();
    write_distinct_pngs(&nested, "inner", 5);

    let comparer = Comparer::new(&Config::default());
    let files = comparer.validate(&[dir.path().to_path_buf()]).unwrap();

    assert_eq!(files.len(), 10);
    assert!(files.iter().all(|f| f.path.parent() == Some(dir.path())));
}

#[test]
fn test_recursive_includes_nested_directory() {
    let dir = tempdir().unwrap();
    write_distinct_pngs(dir.path(), "top", 10);
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).unwrap();
    write_distinct_pngs(&nested, "inner", 5);

    let config = Config {
        recursive: true,
        ..Config::default()
    };
    let files = Comparer::new(&config)
        .validate(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(files.len(), 15);
}

#[test]
fn test_content_sniffing_not_extensions() {
    let dir = tempdir().unwrap();
    let real = write_png(dir.path(), "real.png", &checkerboard(16, 4));
    let renamed = dir.path().join("renamed.txt");
    fs::copy(&real, &renamed).unwrap();
    fs::write(dir.path().join("fake.png"), b"definitely not a png").unwrap();
    fs::write(dir.path().join("empty.jpg"), b"").unwrap();

    let files = Comparer::new(&Config::default())
        .validate(&[dir.path().to_path_buf()])
        .unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|f| f.path.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, vec!["real.png", "renamed.txt"]);
    assert_eq!(files[1].format_name(), "png");
}

#[test]
fn test_zero_images_is_not_an_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

    let files = Comparer::new(&Config::default())
        .validate(&[dir.path().to_path_buf()])
        .unwrap();
    assert!(files.is_empty());
}

#[test]
fn test_missing_root_fails_whole_call() {
    let dir = tempdir().unwrap();
    write_distinct_pngs(dir.path(), "ok", 2);
    let missing = dir.path().join("missing");

    let result = Comparer::new(&Config::default())
        .validate(&[dir.path().to_path_buf(), missing.clone()]);

    match result {
        Err(ValidateError::NotFound(path)) => assert_eq!(path, missing),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[cfg(unix)]
#[test]
fn test_unreadable_root_fails_whole_call() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempdir().unwrap();
    let locked = dir.path().join("locked");
    fs::create_dir(&locked).unwrap();
    write_distinct_pngs(&locked, "img", 2);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can read anything; nothing to check then
    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = Comparer::new(&Config::default()).validate(&[locked.clone()]);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    assert!(matches!(
        result,
        Err(ValidateError::PermissionDenied(_)) | Err(ValidateError::Io { .. })
    ));
}

#[test]
fn test_explicit_files_and_overlapping_roots() {
    let dir = tempdir().unwrap();
    let paths = write_distinct_pngs(dir.path(), "img", 3);

    let roots: Vec<PathBuf> = vec![paths[2].clone(), dir.path().to_path_buf()];
    let files = Comparer::new(&Config::default()).validate(&roots).unwrap();

    let listed: Vec<&PathBuf> = files.iter().map(|f| &f.path).collect();
    assert_eq!(listed, vec![&paths[2], &paths[0], &paths[1]]);
}

#[test]
fn test_aliased_roots_list_file_once() {
    let dir = tempdir().unwrap();
    let file = write_png(dir.path(), "a.png", &checkerboard(16, 4));
    fs::create_dir(dir.path().join("sub")).unwrap();
    let alias = dir.path().join("sub").join("..");

    let comparer = Comparer::new(&Config::default());
    let roots = vec![dir.path().to_path_buf(), alias.clone(), alias.join("a.png")];
    let files = comparer.validate(&roots).unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, file);

    let (map, summary) = comparer.compare(&files).unwrap();
    assert!(map.is_empty());
    assert_eq!(summary.duplicate_files, 0);
}

#[cfg(unix)]
#[test]
fn test_symlink_and_hardlink_are_not_separate_files() {
    let dir = tempdir().unwrap();
    let file = write_png(dir.path(), "a.png", &checkerboard(16, 4));
    std::os::unix::fs::symlink(&file, dir.path().join("link.png")).unwrap();
    fs::hard_link(&file, dir.path().join("hard.png")).unwrap();

    let files = Comparer::new(&Config::default())
        .validate(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(files.len(), 1);
}
