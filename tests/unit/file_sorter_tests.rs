/*!
 * Tests for sorting a directory into per-base-name subdirectories
 */

use anyhow::Result;
use std::fs;

use nutrisync::file_sorter::FileSorter;

use crate::common;

#[test]
fn test_sort_shouldMoveFilesIntoBaseNameDirectories() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "report1.txt", "one")?;
    common::create_test_file(root, "report1.csv", "one,csv")?;
    common::create_test_file(root, "report2.txt", "two")?;

    let report = FileSorter::new(root).sort_into_subdirectories()?;

    assert_eq!(report.moved.len(), 3);
    assert_eq!(report.created_dirs.len(), 2);
    assert!(report.failed.is_empty());
    assert_eq!(fs::read_to_string(root.join("report1").join("report1.txt"))?, "one");
    assert!(root.join("report1").join("report1.csv").is_file());
    assert_eq!(fs::read_to_string(root.join("report2").join("report2.txt"))?, "two");
    assert!(!root.join("report1.txt").exists());
    Ok(())
}

#[test]
fn test_sort_withExistingDestination_shouldKeepOriginalAndRenameNewFile() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    fs::create_dir(root.join("report1"))?;
    common::create_test_file(&root.join("report1"), "report1.txt", "old")?;
    common::create_test_file(root, "report1.txt", "new")?;

    let report = FileSorter::new(root).sort_into_subdirectories()?;

    assert_eq!(report.moved.len(), 1);
    let moved = &report.moved[0];
    assert!(moved.renamed);
    assert_eq!(fs::read_to_string(root.join("report1").join("report1.txt"))?, "old");
    assert_eq!(fs::read_to_string(&moved.to)?, "new");

    let new_name = moved.to.file_name().unwrap().to_string_lossy().into_owned();
    let stamp = new_name
        .strip_prefix("report1_")
        .and_then(|rest| rest.strip_suffix(".txt"))
        .expect("timestamped name");
    assert!(chrono::NaiveDateTime::parse_from_str(stamp, "%Y%m%d_%H%M%S").is_ok(), "{}", stamp);
    Ok(())
}

#[test]
fn test_sort_shouldLeaveDirectoriesAndUnmatchedNamesInPlace() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    fs::create_dir(root.join("archive"))?;
    common::create_test_file(root, "-draft.txt", "x")?;
    common::create_test_file(root, ".hidden", "x")?;

    let report = FileSorter::new(root).sort_into_subdirectories()?;

    assert!(report.moved.is_empty());
    assert_eq!(report.skipped_dirs, vec![root.join("archive")]);
    assert_eq!(report.skipped_files.len(), 2);
    assert!(root.join("-draft.txt").is_file());
    assert!(root.join(".hidden").is_file());
    Ok(())
}

#[test]
fn test_sort_calledTwice_shouldNotTouchSortedFiles() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "report1.txt", "one")?;

    let sorter = FileSorter::new(root);
    sorter.sort_into_subdirectories()?;
    let second = sorter.sort_into_subdirectories()?;

    assert!(second.moved.is_empty());
    assert_eq!(second.skipped_dirs, vec![root.join("report1")]);
    assert!(root.join("report1").join("report1.txt").is_file());
    assert!(!root.join("report1").join("report1").exists());
    Ok(())
}

#[test]
fn test_sort_withEmptyDirectory_shouldReportNothing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let report = FileSorter::new(temp_dir.path()).sort_into_subdirectories()?;
    assert_eq!(report, Default::default());
    Ok(())
}

#[test]
fn test_sort_withFileNamedLikeItsBaseName_shouldSkipIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path();
    common::create_test_file(root, "notes", "plain")?;
    common::create_test_file(root, "notes.txt", "text")?;
    common::create_test_file(root, "report1.txt", "one")?;

    let sorter = FileSorter::new(root);
    let report = sorter.sort_into_subdirectories()?;

    assert!(report.failed.is_empty());
    assert_eq!(report.skipped_files, vec![root.join("notes"), root.join("notes.txt")]);
    assert_eq!(report.moved.len(), 1);
    assert_eq!(fs::read_to_string(root.join("notes"))?, "plain");
    assert!(root.join("notes.txt").is_file());

    // Stable across sweeps
    let again = sorter.sort_into_subdirectories()?;
    assert!(again.failed.is_empty());
    assert_eq!(again.skipped_files.len(), 2);
    Ok(())
}
