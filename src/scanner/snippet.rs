use std::path::Path;

use tracing::debug;

/// Appended to a snippet that was cut at the char budget.
pub const TRUNCATION_MARKER: &str = "\n…(truncated)…";

/// Extensionless files below this size are treated as text (LICENSE, Makefile).
pub const EXTENSIONLESS_TEXT_LIMIT: u64 = 200_000;

/// Lowercase extensions that are read as text.
pub const TEXT_EXTENSIONS: &[&str] = &[
    "py", "md", "txt", "toml", "yaml", "yml", "json", "ini", "cfg", "env", "gitignore", "js",
    "ts", "tsx", "jsx", "html", "css", "sql", "sh", "ps1", "rs",
];

/// Cheap text/binary guess from the extension and size alone.
///
/// Dotfiles such as `.env` have no extension and fall under the size rule.
pub fn is_probably_text(path: &Path, size: u64) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_lowercase();
            TEXT_EXTENSIONS.contains(&ext.as_str())
        }
        None => size < EXTENSIONLESS_TEXT_LIMIT,
    }
}

/// Reads bounded, normalized text snippets for selected files.
#[derive(Debug, Clone, Copy)]
pub struct SnippetExtractor {
    max_chars: usize,
}

impl SnippetExtractor {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }

    /// Snippet for `path`, or an empty string for non-text and unreadable files.
    pub fn extract(&self, path: &Path, size: u64) -> String {
        if !is_probably_text(path, size) {
            return String::new();
        }

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Could not read snippet from {}: {}", path.display(), e);
                return String::new();
            }
        };

        let text = String::from_utf8_lossy(&bytes).replace("\r\n", "\n");
        truncate_chars(&text, self.max_chars)
    }
}

/// Cuts `text` to `max_chars` chars, appending [`TRUNCATION_MARKER`] when cut.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((boundary, _)) => format!("{}{}", &text[..boundary], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}
