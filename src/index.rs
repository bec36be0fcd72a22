use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::IndexConfig;
use crate::error::ConfigError;
use crate::scanner::{
    relative_path, render_tree_preview, ImportanceRanker, RepositoryScanner, SnippetExtractor,
};

/// A selected file and its (possibly empty) snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedFile {
    /// Relative to the index root, `/`-separated.
    pub path: String,
    pub size: u64,
    pub snippet: String,
}

/// Bounded summary of a project directory.
///
/// `file_count` and `total_bytes` cover only the files the walk visited before
/// a budget stopped it; `truncated` says whether that happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIndex {
    pub root: PathBuf,
    pub file_count: usize,
    pub total_bytes: u64,
    pub important: Vec<IndexedFile>,
    pub tree_preview: String,
    pub truncated: bool,
}

impl ProjectIndex {
    pub fn important_paths(&self) -> impl Iterator<Item = &str> {
        self.important.iter().map(|f| f.path.as_str())
    }
}

/// Walks, ranks and snippets a project tree into a [`ProjectIndex`].
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    scanner: RepositoryScanner,
    ranker: ImportanceRanker,
    snippets: SnippetExtractor,
    tree_preview_lines: usize,
}

impl IndexBuilder {
    pub fn new(config: &IndexConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            scanner: RepositoryScanner::new(config),
            ranker: ImportanceRanker::new(config)?,
            snippets: SnippetExtractor::new(config.max_snippet_chars),
            tree_preview_lines: config.tree_preview_lines,
        })
    }

    /// Never fails: a missing or unreadable root yields an empty index.
    pub fn build(&self, project_root: &Path) -> ProjectIndex {
        let root = project_root
            .canonicalize()
            .unwrap_or_else(|_| project_root.to_path_buf());

        let scan = self.scanner.scan(&root);
        let ranked = self.ranker.rank(&root, &scan.files);

        let important: Vec<IndexedFile> = ranked
            .iter()
            .map(|path| {
                let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or_else(|e| {
                    debug!("Cannot stat {}: {}", path.display(), e);
                    0
                });
                IndexedFile {
                    path: relative_path(&root, path),
                    size,
                    snippet: self.snippets.extract(path, size),
                }
            })
            .collect();

        let tree_preview = render_tree_preview(
            scan.files.iter().map(|f| f.relative_path.as_str()),
            self.tree_preview_lines,
        );

        info!(
            "Indexed {}: {} files, {} important",
            root.display(),
            scan.file_count,
            important.len()
        );

        ProjectIndex {
            root,
            file_count: scan.file_count,
            total_bytes: scan.total_bytes,
            important,
            tree_preview,
            truncated: scan.truncated,
        }
    }
}

/// One-shot convenience over [`IndexBuilder`].
pub fn build_index(project_root: &Path, config: &IndexConfig) -> Result<ProjectIndex, ConfigError> {
    Ok(IndexBuilder::new(config)?.build(project_root))
}
