use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::config::IndexConfig;

/// A file visited by the walk, before any ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Path relative to the scan root, `/`-separated.
    pub relative_path: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub root: PathBuf,
    /// Files in visit order.
    pub files: Vec<ScannedFile>,
    pub file_count: usize,
    pub total_bytes: u64,
    /// Set when the walk stopped on `max_files` or `max_total_bytes`.
    pub truncated: bool,
}

/// Budgeted directory walker.
///
/// Subdirectories whose bare name is in `exclude_dirs` are pruned before the
/// walk descends into them, at any depth. Files are visited in the order the
/// filesystem yields them and every one counts against the budgets, whatever
/// its type. The walk stops as soon as either budget is reached, so the
/// result can be a strict prefix of the tree.
#[derive(Debug, Clone)]
pub struct RepositoryScanner {
    max_files: usize,
    max_total_bytes: u64,
    exclude_dirs: BTreeSet<String>,
}

impl RepositoryScanner {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            max_files: config.max_files,
            max_total_bytes: config.max_total_bytes,
            exclude_dirs: config.exclude_dirs.clone(),
        }
    }

    pub fn scan(&self, root: &Path) -> ScanResult {
        let start_time = Instant::now();

        let mut files = Vec::new();
        let mut file_count = 0usize;
        let mut total_bytes = 0u64;
        let mut truncated = false;

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| !self.is_excluded_dir(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            // Follows symlinks so a linked file counts with its target's size.
            let metadata = match std::fs::metadata(entry.path()) {
                Ok(metadata) => metadata,
                Err(e) => {
                    debug!("Skipping {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            if !metadata.is_file() {
                continue;
            }

            let size = metadata.len();
            file_count += 1;
            total_bytes = total_bytes.saturating_add(size);
            files.push(ScannedFile {
                path: entry.path().to_path_buf(),
                relative_path: relative_path(root, entry.path()),
                size,
            });

            if file_count >= self.max_files || total_bytes >= self.max_total_bytes {
                truncated = true;
                break;
            }
        }

        info!(
            "Scanned {} files ({} bytes) under {} in {:?}{}",
            file_count,
            total_bytes,
            root.display(),
            start_time.elapsed(),
            if truncated { ", stopped at budget" } else { "" }
        );

        ScanResult {
            root: root.to_path_buf(),
            files,
            file_count,
            total_bytes,
            truncated,
        }
    }

    fn is_excluded_dir(&self, entry: &DirEntry) -> bool {
        // The root is never pruned, whatever its name.
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        entry
            .file_name()
            .to_str()
            .is_some_and(|name| self.exclude_dirs.contains(name))
    }
}

/// Renders `path` relative to `root` with `/` separators.
///
/// Paths outside `root` are rendered as given.
pub fn relative_path(root: &Path, path: &Path) -> String {
    match path.strip_prefix(root) {
        Ok(relative) => relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name),
                _ => None,
            })
            .map(OsStr::to_string_lossy)
            .collect::<Vec<_>>()
            .join("/"),
        Err(_) => path.to_string_lossy().into_owned(),
    }
}
