use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "repobrief.toml";

/// Prefix for environment overrides, e.g. `REPOBRIEF_INDEX__MAX_FILES`.
pub const ENV_PREFIX: &str = "REPOBRIEF";

pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    ".venv",
    "venv",
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    "node_modules",
    "dist",
    "build",
    ".idea",
    ".vscode",
    // runtime output of this tool
    "data",
    "target",
];

/// Resource budgets and heuristics for building a [`crate::ProjectIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub max_files: usize,
    pub max_total_bytes: u64,
    pub max_snippet_chars: usize,
    pub important_limit: usize,
    pub exclude_dirs: BTreeSet<String>,
    /// Glob for tier-2 top-level source files, matched against bare file names.
    pub top_level_glob: String,
    pub tree_preview_lines: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_files: 2000,
            max_total_bytes: 20_000_000,
            max_snippet_chars: 3000,
            important_limit: 12,
            exclude_dirs: DEFAULT_EXCLUDE_DIRS.iter().map(|d| d.to_string()).collect(),
            top_level_glob: "*.py".to_string(),
            tree_preview_lines: 120,
        }
    }
}

impl IndexConfig {
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    pub fn with_max_total_bytes(mut self, max_total_bytes: u64) -> Self {
        self.max_total_bytes = max_total_bytes;
        self
    }

    pub fn with_max_snippet_chars(mut self, max_snippet_chars: usize) -> Self {
        self.max_snippet_chars = max_snippet_chars;
        self
    }

    pub fn with_important_limit(mut self, important_limit: usize) -> Self {
        self.important_limit = important_limit;
        self
    }

    pub fn with_exclude_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }
}

/// Settings for the OpenAI-compatible text backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub model: String,
    pub base_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    /// `None` leaves the request unbounded.
    pub timeout_seconds: Option<u64>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            model: "gpt-5.2".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub reports_dir: PathBuf,
    pub runs_dir: PathBuf,
    pub index: IndexConfig,
    pub backend: BackendConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("data");
        Self {
            reports_dir: data_dir.join("reports"),
            runs_dir: data_dir.join("runs"),
            data_dir,
            index: IndexConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl AppConfig {
    /// Layers built-in defaults, an optional TOML file and `REPOBRIEF_*`
    /// environment overrides.
    ///
    /// An explicit `path` must exist. Without one, `repobrief.toml` in the
    /// working directory is used when present.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        // Missing keys fall back to the serde defaults, so a partial file only
        // overrides what it names.
        let mut builder = Config::builder();

        match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotFound(path.to_path_buf()));
                }
                debug!("Loading configuration from {}", path.display());
                builder = builder.add_source(File::from(path).format(FileFormat::Toml));
            }
            None => {
                builder = builder
                    .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Toml).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("index.exclude_dirs")
                .try_parsing(true),
        );

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Parses a TOML document; keys it omits keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(source, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn output_dirs(&self) -> [&Path; 3] {
        [
            self.data_dir.as_path(),
            self.runs_dir.as_path(),
            self.reports_dir.as_path(),
        ]
    }

    /// Creates the data, runs and reports directories.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in self.output_dirs() {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
