use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::backend::{BackendResponse, TextBackend};
use crate::config::BackendConfig;
use crate::error::BackendError;

/// Overrides the configured model when set.
pub const MODEL_ENV: &str = "OPENAI_MODEL";

/// Client for the OpenAI Responses API.
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, BackendError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            api_key: api_key.into(),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Reads the API key from `config.api_key_env` and the model from
    /// `OPENAI_MODEL`, falling back to `config.model`.
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| BackendError::MissingApiKey(config.api_key_env.clone()))?;
        let model = std::env::var(MODEL_ENV).unwrap_or_else(|_| config.model.clone());

        Self::new(
            api_key,
            model,
            config.base_url.clone(),
            config.timeout_seconds.map(Duration::from_secs),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, developer: &str, user: &str) -> Value {
        json!({
            "model": self.model,
            "input": [
                {"role": "developer", "type": "message", "content": developer},
                {"role": "user", "type": "message", "content": user},
            ],
        })
    }
}

#[async_trait]
impl TextBackend for OpenAiBackend {
    #[instrument(skip(self, developer, user), fields(model = %self.model))]
    async fn respond_text(
        &self,
        developer: &str,
        user: &str,
    ) -> Result<BackendResponse, BackendError> {
        let url = format!("{}/responses", self.base_url);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(developer, user))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        Ok(BackendResponse {
            text: output_text(&raw),
            raw,
        })
    }
}

/// Text of a Responses API body: the top-level `output_text` when present,
/// else every `output_text` content part of `output`, concatenated.
pub fn output_text(raw: &Value) -> String {
    if let Some(text) = raw.get("output_text").and_then(Value::as_str) {
        return text.to_string();
    }

    raw.get("output")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend(server: &MockServer) -> OpenAiBackend {
        OpenAiBackend::new("test-key", "test-model", server.uri(), None).unwrap()
    }

    #[test]
    fn test_output_text_prefers_top_level_field() {
        let raw = json!({"output_text": "direct", "output": []});
        assert_eq!(output_text(&raw), "direct");
    }

    #[test]
    fn test_output_text_concatenates_message_parts() {
        let raw = json!({
            "output": [
                {"type": "reasoning", "summary": []},
                {"type": "message", "content": [
                    {"type": "output_text", "text": "{\"a\":"},
                    {"type": "refusal", "refusal": "no"},
                    {"type": "output_text", "text": "1}"}
                ]}
            ]
        });
        assert_eq!(output_text(&raw), "{\"a\":1}");
    }

    #[test]
    fn test_output_text_of_empty_body() {
        assert_eq!(output_text(&json!({})), "");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let backend = OpenAiBackend::new("k", "m", "http://localhost:1/v1/", None).unwrap();
        assert_eq!(backend.base_url, "http://localhost:1/v1");
        assert_eq!(backend.model(), "m");
    }

    #[test]
    fn test_missing_api_key() {
        let config = BackendConfig {
            api_key_env: "REPOBRIEF_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..BackendConfig::default()
        };
        let err = OpenAiBackend::from_config(&config).unwrap_err();
        assert!(matches!(err, BackendError::MissingApiKey(name) if name == config.api_key_env));
    }

    #[tokio::test]
    async fn test_request_contract() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/responses"))
            .and(header("authorization", "Bearer test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "output": [{"type": "message", "content": [
                    {"type": "output_text", "text": "hello"}
                ]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = backend(&server)
            .respond_text("be strict", "the plan")
            .await
            .unwrap();
        assert_eq!(response.text, "hello");

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["input"][0]["role"], "developer");
        assert_eq!(body["input"][0]["content"], "be strict");
        assert_eq!(body["input"][1]["role"], "user");
        assert_eq!(body["input"][1]["content"], "the plan");
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = backend(&server).respond_text("d", "u").await.unwrap_err();
        match err {
            BackendError::Status { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_undecodable_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = backend(&server).respond_text("d", "u").await.unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
    }
}
