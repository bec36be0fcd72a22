//! The one capability this crate needs from a generative-text service:
//! "given a developer instruction and a user message, return response text".

pub mod openai;
pub mod scripted;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BackendError;

pub use openai::OpenAiBackend;
pub use scripted::ScriptedBackend;

#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    pub text: String,
    /// Decoded response body, kept for diagnostics.
    pub raw: Value,
}

impl BackendResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            raw: Value::Null,
        }
    }
}

/// A generative-text backend. Implementations make a single round trip per
/// call with no retry of their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextBackend: Send + Sync {
    async fn respond_text(&self, developer: &str, user: &str)
        -> Result<BackendResponse, BackendError>;
}
