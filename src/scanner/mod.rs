pub mod discovery;
pub mod ranking;
pub mod snippet;
pub mod tree;

pub use discovery::{relative_path, RepositoryScanner, ScanResult, ScannedFile};
pub use ranking::{ImportanceRanker, MAX_TOP_LEVEL_SOURCES, PREFERRED_NAMES};
pub use snippet::{is_probably_text, truncate_chars, SnippetExtractor, TRUNCATION_MARKER};
pub use tree::render_tree_preview;
