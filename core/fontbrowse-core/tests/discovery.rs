/// Folder scanning against real directory trees.
use std::fs;
use std::path::PathBuf;

use fontbrowse_core::discovery::{FolderScanner, FontFolder};
use fontbrowse_core::error::BrowseError;

#[test]
fn discovers_font_extensions_recursively() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = fs::canonicalize(temp.path()).expect("canonical root");

    let font1 = root.join("a.ttf");
    let nested = root.join("nested/deeper");
    fs::create_dir_all(&nested).unwrap();
    let font2 = nested.join("b.WOFF2");

    fs::write(&font1, b"\0\0font1").unwrap();
    fs::write(&font2, b"\0\0font2").unwrap();
    fs::write(root.join("readme.txt"), b"hello").unwrap();

    let report = FolderScanner::new([FontFolder::new(&root, true)])
        .include_system_fonts(false)
        .scan();

    let paths: Vec<PathBuf> = report.paths.into_iter().collect();
    assert_eq!(paths.len(), 2);
    assert!(paths.contains(&font1));
    assert!(paths.contains(&font2));
    assert!(report.failures.is_empty());
}

#[test]
fn ignores_non_font_extensions() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("readme.txt"), b"hello").unwrap();
    fs::write(temp.path().join("collection.ttc"), b"ttcf").unwrap();

    let report = FolderScanner::new([FontFolder::new(temp.path(), true)])
        .include_system_fonts(false)
        .scan();

    assert!(report.paths.is_empty());
    assert_eq!(report.scanned_folders, 1);
}

#[test]
fn unreadable_folder_becomes_a_file_access_failure() {
    let temp = tempfile::tempdir().expect("tempdir");
    let not_a_dir = temp.path().join("font.ttf");
    fs::write(&not_a_dir, b"").unwrap();

    let report = FolderScanner::new([
        FontFolder::new("/nonexistent/fontbrowse-fonts", false),
        FontFolder::new(&not_a_dir, false),
    ])
    .include_system_fonts(false)
    .scan();

    assert_eq!(report.scanned_folders, 0);
    assert_eq!(report.failures.len(), 2);
    assert!(report
        .failures
        .iter()
        .all(|err| matches!(err, BrowseError::FileAccess { .. }) && err.is_per_item()));
}

#[test]
fn scan_result_is_sorted_and_stable() {
    let temp = tempfile::tempdir().expect("tempdir");
    for name in ["c.otf", "a.ttf", "b.woff"] {
        fs::write(temp.path().join(name), b"").unwrap();
    }
    let scanner = FolderScanner::new([FontFolder::new(temp.path(), false)]).include_system_fonts(false);

    let first: Vec<PathBuf> = scanner.scan().paths.into_iter().collect();
    let second: Vec<PathBuf> = scanner.scan().paths.into_iter().collect();
    assert_eq!(first, second);

    let names: Vec<String> = first
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.ttf", "b.woff", "c.otf"]);
}
