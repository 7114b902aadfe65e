/*!
 * Sorting of a watched directory into per-base-name subdirectories.
 *
 * Only the top level of the directory is swept, so files already moved into
 * a subdirectory are never picked up again.
 */

use chrono::Local;
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};

use crate::errors::SortError;
use crate::file_utils::FileManager;

/// Timestamp format appended to colliding file names
pub const COLLISION_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// A file that was moved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedFile {
    /// Original location
    pub from: PathBuf,
    /// New location
    pub to: PathBuf,
    /// Whether the name got a timestamp because the destination existed
    pub renamed: bool,
}

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortReport {
    /// Files moved into subdirectories
    pub moved: Vec<MovedFile>,
    /// Subdirectories created during the sweep
    pub created_dirs: Vec<PathBuf>,
    /// Files whose name has no leading word characters, or whose target
    /// directory name is taken by a file
    pub skipped_files: Vec<PathBuf>,
    /// Directories left in place
    pub skipped_dirs: Vec<PathBuf>,
    /// Files that could not be moved, with the reason
    pub failed: Vec<(PathBuf, String)>,
}

/// Sorts the top level of a directory by file base name
#[derive(Debug, Clone)]
pub struct FileSorter {
    root: PathBuf,
}

impl FileSorter {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Move every top-level file into `root/<base name>/`.
    ///
    /// Each file is handled independently: a failed move is logged and
    /// recorded, and the sweep continues.
    pub fn sort_into_subdirectories(&self) -> Result<SortReport, SortError> {
        info!("Monitoring folder: {:?}", self.root);

        if !self.root.is_dir() {
            error!("Folder does not exist: {:?}", self.root);
            return Err(SortError::MissingDirectory(self.root.clone()));
        }

        let entries = FileManager::list_entries(&self.root).map_err(|e| SortError::Io {
            path: self.root.clone(),
            source: std::io::Error::other(format!("{:#}", e)),
        })?;
        debug!("Files in directory before processing: {:?}", entries);

        let mut report = SortReport::default();
        for path in entries {
            if path.is_dir() {
                debug!("Skipping directory: {:?}", path);
                report.skipped_dirs.push(path);
                continue;
            }
            self.sort_file(path, &mut report);
        }

        info!(
            "Sorted {:?}: {} moved, {} skipped, {} failed",
            self.root,
            report.moved.len(),
            report.skipped_files.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn sort_file(&self, path: PathBuf, report: &mut SortReport) {
        let file_name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => return,
        };
        info!("Processing file: {}", file_name);

        let Some(base_name) = FileManager::base_name(&file_name) else {
            warn!("Filename does not match expected pattern: {}", file_name);
            report.skipped_files.push(path);
            return;
        };

        let dest_dir = self.root.join(base_name);
        if dest_dir.exists() && !dest_dir.is_dir() {
            warn!(
                "Cannot sort {}: a file named '{}' occupies the target directory name",
                file_name, base_name
            );
            report.skipped_files.push(path);
            return;
        }
        match FileManager::ensure_dir(&dest_dir) {
            Ok(true) => {
                info!("Created directory: {:?}", dest_dir);
                report.created_dirs.push(dest_dir.clone());
            }
            Ok(false) => {}
            Err(e) => {
                error!("Failed to move file: {}. Error: {:#}", file_name, e);
                report.failed.push((path, format!("{:#}", e)));
                return;
            }
        }

        let (destination, renamed) = Self::free_destination(&dest_dir, &file_name);
        if renamed {
            info!("File already exists. Renaming to: {:?}", destination.file_name().unwrap_or_default());
        }

        match FileManager::move_file(&path, &destination) {
            Ok(()) => {
                info!("Moved file: {} to {:?}", file_name, destination);
                report.moved.push(MovedFile {
                    from: path,
                    to: destination,
                    renamed,
                });
            }
            Err(e) => {
                error!("Failed to move file: {}. Error: {:#}", file_name, e);
                report.failed.push((path, format!("{:#}", e)));
            }
        }
    }

    /// Destination path inside `dest_dir` that does not exist yet
    fn free_destination(dest_dir: &Path, file_name: &str) -> (PathBuf, bool) {
        let direct = dest_dir.join(file_name);
        if !direct.exists() {
            return (direct, false);
        }

        let timestamp = Local::now().format(COLLISION_TIMESTAMP_FORMAT).to_string();
        let mut candidate = dest_dir.join(FileManager::suffixed_file_name(file_name, &timestamp));
        let mut counter = 1;
        while candidate.exists() {
            let suffix = format!("{}_{}", timestamp, counter);
            candidate = dest_dir.join(FileManager::suffixed_file_name(file_name, &suffix));
            counter += 1;
        }
        (candidate, true)
    }
}
