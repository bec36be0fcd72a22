use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use tracing::debug;

use crate::config::IndexConfig;
use crate::error::ConfigError;
use crate::scanner::discovery::ScannedFile;
use crate::scanner::snippet::is_probably_text;

/// Tier-1 names, looked up directly under the root in this order.
pub const PREFERRED_NAMES: &[&str] = &[
    "README.md",
    "README.txt",
    "pyproject.toml",
    "requirements.txt",
    "package.json",
    "Dockerfile",
    "docker-compose.yml",
    ".env",
    ".env.example",
    "main.py",
    "app.py",
    "Cargo.toml",
];

/// Cap on tier-2 top-level source files.
pub const MAX_TOP_LEVEL_SOURCES: usize = 6;

/// Picks the files worth a snippet, in three tiers:
///
/// 1. [`PREFERRED_NAMES`] present directly under the root,
/// 2. up to [`MAX_TOP_LEVEL_SOURCES`] root files matching the top-level glob,
///    in lexicographic order,
/// 3. scanned files that look like text, smallest first.
///
/// Tiers 1 and 2 consult the filesystem directly, so they can select files the
/// budgeted walk never reached. Paths are never selected twice and selection
/// stops at the limit.
#[derive(Debug, Clone)]
pub struct ImportanceRanker {
    limit: usize,
    top_level: GlobMatcher,
}

impl ImportanceRanker {
    pub fn new(config: &IndexConfig) -> Result<Self, ConfigError> {
        let top_level = Glob::new(&config.top_level_glob)?.compile_matcher();
        Ok(Self {
            limit: config.important_limit,
            top_level,
        })
    }

    /// Returns absolute paths in selection order.
    pub fn rank(&self, root: &Path, scanned: &[ScannedFile]) -> Vec<PathBuf> {
        let mut selection = Selection::new(self.limit);

        for name in PREFERRED_NAMES {
            let candidate = root.join(name);
            if candidate.is_file() {
                selection.push(candidate);
            }
        }

        for candidate in self.top_level_sources(root) {
            selection.push(candidate);
        }

        let mut text_files: Vec<&ScannedFile> = scanned
            .iter()
            .filter(|file| is_probably_text(&file.path, file.size))
            .collect();
        // Stable: equal sizes keep walk order.
        text_files.sort_by_key(|file| file.size);
        for file in text_files {
            if selection.is_full() {
                break;
            }
            selection.push(file.path.clone());
        }

        selection.into_paths()
    }

    fn top_level_sources(&self, root: &Path) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot list {}: {}", root.display(), e);
                return Vec::new();
            }
        };

        let mut matches: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| self.top_level.is_match(Path::new(name)))
            })
            .collect();
        matches.sort();
        matches.truncate(MAX_TOP_LEVEL_SOURCES);
        matches
    }
}

/// Ordered, de-duplicated, bounded list of picks.
struct Selection {
    limit: usize,
    seen: HashSet<PathBuf>,
    paths: Vec<PathBuf>,
}

impl Selection {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            seen: HashSet::new(),
            paths: Vec::new(),
        }
    }

    fn is_full(&self) -> bool {
        self.paths.len() >= self.limit
    }

    fn push(&mut self, path: PathBuf) {
        if self.is_full() || self.seen.contains(&path) {
            return;
        }
        self.seen.insert(path.clone());
        self.paths.push(path);
    }

    fn into_paths(self) -> Vec<PathBuf> {
        self.paths
    }
}
