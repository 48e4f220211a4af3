//! Tests for directory copy and swap used by package staging

use pretty_assertions::assert_eq;
use rstest::rstest;
use shell_fs::dir::{copy_dir_all, remove_dir_if_exists, swap_dir};
use shell_fs::Error;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn copy_dir_all_copies_nested_tree() {
    let dir = tempdir().unwrap();
    let src = dir.path().join("src");
    write(&src.join("extension.toml"), "manifest");
    write(&src.join("lib").join("driver.js"), "code");

    let dst = dir.path().join("dst");
    let copied = copy_dir_all(&src, &dst).unwrap();

    assert_eq!(copied, 2);
    assert_eq!(fs::read_to_string(dst.join("extension.toml")).unwrap(), "manifest");
    assert_eq!(
        fs::read_to_string(dst.join("lib").join("driver.js")).unwrap(),
        "code"
    );
}

#[test]
fn copy_dir_all_rejects_file_source() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("file.txt");
    write(&file, "x");

    let err = copy_dir_all(&file, &dir.path().join("out")).unwrap_err();
    assert!(matches!(err, Error::NotADirectory { .. }));
}

#[rstest]
#[case::fresh_target(false)]
#[case::existing_target(true)]
fn swap_dir_installs_staged_content(#[case] target_exists: bool) {
    let dir = tempdir().unwrap();
    let staged = dir.path().join(".staging").join("pkg");
    write(&staged.join("version.txt"), "2.0");

    let target = dir.path().join("pkg");
    if target_exists {
        write(&target.join("version.txt"), "1.0");
        write(&target.join("obsolete.txt"), "old");
    }

    swap_dir(&staged, &target).unwrap();

    assert_eq!(fs::read_to_string(target.join("version.txt")).unwrap(), "2.0");
    assert!(!target.join("obsolete.txt").exists());
    assert!(!staged.exists());

    // No backup directories left behind
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().ends_with(".old"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn swap_dir_without_staged_keeps_target() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("pkg");
    write(&target.join("version.txt"), "1.0");

    let err = swap_dir(&dir.path().join("missing"), &target).unwrap_err();
    assert!(matches!(err, Error::NotADirectory { .. }));
    assert_eq!(fs::read_to_string(target.join("version.txt")).unwrap(), "1.0");
}

#[test]
fn remove_dir_if_exists_removes_tree() {
    let dir = tempdir().unwrap();
    let tree = dir.path().join("tree");
    write(&tree.join("a").join("b.txt"), "b");

    remove_dir_if_exists(&tree).unwrap();
    assert!(!tree.exists());
}
