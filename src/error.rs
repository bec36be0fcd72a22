use std::path::PathBuf;

use thiserror::Error;

/// Longest excerpt of a non-JSON backend reply quoted in a violation.
pub const NOT_JSON_EXCERPT_CHARS: usize = 60;

/// Longest excerpt of raw backend output quoted for parse and schema failures.
pub const RAW_EXCERPT_CHARS: usize = 8000;

/// A deviation from the JSON-only TaskSpec output contract.
///
/// Every variant that can carry raw backend output does so as a bounded
/// excerpt so the message stays printable.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ContractViolation {
    #[error("backend did not return JSON-only output; reply starts with: {excerpt:?}")]
    NotJsonObject { excerpt: String },

    #[error("backend returned invalid JSON: {message}\n\nRAW:\n{excerpt}")]
    InvalidJson { message: String, excerpt: String },

    #[error("TaskSpec version mismatch: expected \"task_spec_v1\", found {found}")]
    VersionMismatch { found: String, excerpt: String },

    #[error("TaskSpec.goal missing or empty")]
    MissingGoal { excerpt: String },

    #[error("TaskSpec.steps missing or empty")]
    MissingSteps { excerpt: String },

    #[error("TaskSpec.done_criteria missing or empty")]
    MissingDoneCriteria { excerpt: String },

    #[error("TaskSpec.steps[{index}] is malformed: {reason}")]
    MalformedStep {
        index: usize,
        reason: String,
        excerpt: String,
    },
}

impl ContractViolation {
    /// The bounded prefix of the raw backend output that triggered the violation.
    pub fn excerpt(&self) -> &str {
        match self {
            Self::NotJsonObject { excerpt }
            | Self::InvalidJson { excerpt, .. }
            | Self::VersionMismatch { excerpt, .. }
            | Self::MissingGoal { excerpt }
            | Self::MissingSteps { excerpt }
            | Self::MissingDoneCriteria { excerpt }
            | Self::MalformedStep { excerpt, .. } => excerpt,
        }
    }
}

/// Failures talking to a generative-text backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend API key not found in environment variable {0}")]
    MissingApiKey(String),

    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("backend response could not be decoded: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

/// Errors raised by the strict TaskSpec compiler.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("contract violation: {0}")]
    Contract(#[from] ContractViolation),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("failed to serialize TaskSpec: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write TaskSpec to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by an analysis run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write report to {path}: {source}")]
    WriteReport {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] config::ConfigError),

    #[error("invalid top-level glob: {0}")]
    InvalidGlob(#[from] globset::Error),
}

/// Returns at most `max_chars` leading chars of `raw`.
pub(crate) fn excerpt(raw: &str, max_chars: usize) -> String {
    match raw.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => raw[..byte_idx].to_string(),
        None => raw.to_string(),
    }
}
