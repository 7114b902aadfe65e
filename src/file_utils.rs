use anyhow::{Context, Result, anyhow};
use log::warn;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// @module: File and directory utilities

// @pattern: Leading run of word characters
static BASE_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+").expect("valid base name pattern"));

/// How a file that matches several keywords is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifyPolicy {
    /// The file is listed under every keyword it contains
    #[default]
    AllMatches,
    /// The file is listed under the first keyword (in list order) it contains
    FirstMatch,
}

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @checks: File existence
    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }

    // @checks: Directory existence
    pub fn dir_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_dir()
    }

    // @creates: Directory and parents if needed
    // @returns: true when the directory was created
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<bool> {
        let path = path.as_ref();
        if path.is_dir() {
            return Ok(false);
        }
        fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {:?}", path))?;
        Ok(true)
    }

    /// Direct entries of `dir`, sorted by file name
    pub fn list_entries<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
        let mut result = Vec::new();
        for entry in WalkDir::new(dir.as_ref())
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.context("Failed to read directory entry")?;
            result.push(entry.into_path());
        }
        Ok(result)
    }

    /// Regular files directly inside `dir` with a specific extension
    pub fn find_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<PathBuf>> {
        let wanted = extension.trim_start_matches('.');
        let files = Self::list_entries(dir)?
            .into_iter()
            .filter(|path| path.is_file())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(wanted))
            })
            .collect();
        Ok(files)
    }

    /// Leading `[A-Za-z0-9_]+` run of a file name
    pub fn base_name(file_name: &str) -> Option<&str> {
        BASE_NAME_PATTERN.find(file_name).map(|m| m.as_str())
    }

    /// `<stem>_<suffix><.ext>` for a file name
    pub fn suffixed_file_name(file_name: &str, suffix: &str) -> String {
        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());
        match path.extension() {
            Some(ext) => format!("{}_{}.{}", stem, suffix, ext.to_string_lossy()),
            None => format!("{}_{}", stem, suffix),
        }
    }

    /// Move a file, falling back to copy-then-remove only across filesystems.
    ///
    /// On failure nothing is left at `to` that this call created.
    pub fn move_file<P1: AsRef<Path>, P2: AsRef<Path>>(from: P1, to: P2) -> Result<()> {
        let from = from.as_ref();
        let to = to.as_ref();

        match fs::rename(from, to) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::CrossesDevices => Self::copy_then_remove(from, to),
            Err(e) => Err(e).with_context(|| format!("Failed to move {:?} to {:?}", from, to)),
        }
    }

    // @moves: By copy then unlink; the copy is discarded if either step fails
    fn copy_then_remove(from: &Path, to: &Path) -> Result<()> {
        if to.exists() {
            return Err(anyhow!("Destination already exists: {:?}", to));
        }

        if let Err(e) = fs::copy(from, to) {
            Self::discard_copy(to);
            return Err(e).with_context(|| format!("Failed to copy {:?} to {:?}", from, to));
        }
        if let Err(e) = fs::remove_file(from) {
            Self::discard_copy(to);
            return Err(e).with_context(|| format!("Failed to remove {:?} after copy", from));
        }
        Ok(())
    }

    fn discard_copy(to: &Path) {
        if to.exists() {
            if let Err(e) = fs::remove_file(to) {
                warn!("Could not remove partial copy {:?}: {}", to, e);
            }
        }
    }

    /// Group paths under every keyword their file name contains (case-insensitive)
    pub fn classify<P, S>(paths: &[P], keywords: &[S]) -> BTreeMap<String, Vec<PathBuf>>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        Self::classify_with(paths, keywords, ClassifyPolicy::AllMatches)
    }

    /// Group paths by keyword using an explicit policy.
    ///
    /// Keywords without any matching path are absent from the result.
    pub fn classify_with<P, S>(
        paths: &[P],
        keywords: &[S],
        policy: ClassifyPolicy,
    ) -> BTreeMap<String, Vec<PathBuf>>
    where
        P: AsRef<Path>,
        S: AsRef<str>,
    {
        let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

        for path in paths {
            let path = path.as_ref();
            let Some(file_name) = path.file_name() else {
                continue;
            };
            let file_name = file_name.to_string_lossy().to_lowercase();

            for keyword in keywords {
                let keyword = keyword.as_ref();
                if keyword.is_empty() || !file_name.contains(&keyword.to_lowercase()) {
                    continue;
                }
                categories
                    .entry(keyword.to_string())
                    .or_default()
                    .push(path.to_path_buf());
                if policy == ClassifyPolicy::FirstMatch {
                    break;
                }
            }
        }

        categories
    }
}
