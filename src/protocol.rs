//! Lenient extraction of `FINAL_REPORT` payloads from free-form model output.
//!
//! The input is untrusted prose that may or may not contain a completed
//! payload yet, so every failure here is a `None`, never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Marker token that precedes the fenced JSON payload.
pub const FINAL_MARKER: &str = "FINAL_REPORT";

/// Type tag every final report carries.
pub const FINAL_TYPE: &str = "final";

static FINAL_BLOCK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)FINAL_REPORT\s*```json\s*(\{.*?\})\s*```")
        .expect("FINAL_REPORT pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactOut {
    pub path: String,
    pub description: String,
}

/// Structured completion payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReport {
    #[serde(rename = "type", default = "final_type", deserialize_with = "final_tag")]
    pub kind: String,
    pub summary: String,
    #[serde(default)]
    pub artifacts: Vec<ArtifactOut>,
    #[serde(default)]
    pub next_steps: Vec<String>,
    #[serde(default = "default_done")]
    pub done: bool,
}

impl FinalReport {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            kind: final_type(),
            summary: summary.into(),
            artifacts: Vec::new(),
            next_steps: Vec::new(),
            done: true,
        }
    }

    pub fn with_artifact(mut self, path: impl Into<String>, description: impl Into<String>) -> Self {
        self.artifacts.push(ArtifactOut {
            path: path.into(),
            description: description.into(),
        });
        self
    }

    pub fn with_next_steps<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.next_steps.extend(steps.into_iter().map(Into::into));
        self
    }

    /// Renders the report the way a model is expected to emit it.
    pub fn to_protocol_block(&self) -> Result<String, serde_json::Error> {
        Ok(format!(
            "{}\n```json\n{}\n```",
            FINAL_MARKER,
            serde_json::to_string_pretty(self)?
        ))
    }
}

fn final_type() -> String {
    FINAL_TYPE.to_string()
}

fn default_done() -> bool {
    true
}

fn final_tag<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let tag = String::deserialize(deserializer)?;
    if tag == FINAL_TYPE {
        Ok(tag)
    } else {
        Err(serde::de::Error::custom(format!(
            "expected type \"{}\", found \"{}\"",
            FINAL_TYPE, tag
        )))
    }
}

/// Finds the first `FINAL_REPORT` marker followed by a ```` ```json ```` fence
/// and validates the object inside it.
///
/// Matching ignores case and spans newlines. Returns `None` when the pattern
/// is absent, the JSON does not parse, or the object does not fit the schema.
pub fn try_extract_final_report(text: &str) -> Option<FinalReport> {
    let captures = FINAL_BLOCK_RE.captures(text)?;
    let raw = captures.get(1)?.as_str();

    match serde_json::from_str::<FinalReport>(raw) {
        Ok(report) => Some(report),
        Err(e) => {
            debug!("Ignoring {} block: {}", FINAL_MARKER, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_payload_gets_defaults() {
        let text = "FINAL_REPORT\n```json\n{\"type\":\"final\",\"summary\":\"ok\"}\n```";
        let report = try_extract_final_report(text).unwrap();

        assert_eq!(report.summary, "ok");
        assert_eq!(report.kind, "final");
        assert!(report.artifacts.is_empty());
        assert!(report.next_steps.is_empty());
        assert!(report.done);
    }

    #[test]
    fn test_payload_surrounded_by_prose() {
        let text = r#"I looked at the repository and here is what I found.

FINAL_REPORT
```json
{
  "type": "final",
  "summary": "Indexed 12 files",
  "artifacts": [{"path": "data/reports/run_1_report.md", "description": "report"}],
  "next_steps": ["wire up backend"],
  "done": false
}
```

Let me know if you need anything else."#;

        let report = try_extract_final_report(text).unwrap();
        assert_eq!(report.summary, "Indexed 12 files");
        assert_eq!(report.artifacts.len(), 1);
        assert_eq!(report.artifacts[0].path, "data/reports/run_1_report.md");
        assert_eq!(report.next_steps, vec!["wire up backend"]);
        assert!(!report.done);
    }

    #[test]
    fn test_marker_and_fence_are_case_insensitive() {
        let text = "final_report ```JSON {\"summary\":\"lower\"} ```";
        let report = try_extract_final_report(text).unwrap();
        assert_eq!(report.summary, "lower");
        assert_eq!(report.kind, "final");
    }

    #[test]
    fn test_first_marker_wins() {
        let text = "FINAL_REPORT ```json {\"summary\":\"first\"} ``` and later FINAL_REPORT ```json {\"summary\":\"second\"} ```";
        assert_eq!(try_extract_final_report(text).unwrap().summary, "first");
    }

    #[test]
    fn test_nested_objects_are_captured_whole() {
        let text = "FINAL_REPORT```json\n{\"summary\":\"n\",\"artifacts\":[{\"path\":\"a\",\"description\":\"b\"}]}\n```";
        let report = try_extract_final_report(text).unwrap();
        assert_eq!(report.artifacts[0].description, "b");
    }

    #[test]
    fn test_missing_marker_is_none() {
        assert!(try_extract_final_report("```json {\"summary\":\"ok\"} ```").is_none());
        assert!(try_extract_final_report("").is_none());
        assert!(try_extract_final_report("FINAL_REPORT but no fence").is_none());
    }

    #[test]
    fn test_unterminated_fence_is_none() {
        assert!(try_extract_final_report("FINAL_REPORT ```json {\"summary\":\"ok\"}").is_none());
    }

    #[test]
    fn test_invalid_json_is_none() {
        let text = "FINAL_REPORT ```json {\"summary\": ok} ```";
        assert!(try_extract_final_report(text).is_none());
    }

    #[test]
    fn test_wrong_type_tag_is_none() {
        let text = "FINAL_REPORT ```json {\"type\":\"partial\",\"summary\":\"ok\"} ```";
        assert!(try_extract_final_report(text).is_none());
    }

    #[test]
    fn test_missing_summary_is_none() {
        let text = "FINAL_REPORT ```json {\"type\":\"final\"} ```";
        assert!(try_extract_final_report(text).is_none());
    }

    #[test]
    fn test_wrong_field_types_are_none() {
        let text = "FINAL_REPORT ```json {\"summary\":\"ok\",\"done\":\"yes\"} ```";
        assert!(try_extract_final_report(text).is_none());
        let text = "FINAL_REPORT ```json {\"summary\":\"ok\",\"artifacts\":[{\"path\":1}]} ```";
        assert!(try_extract_final_report(text).is_none());
    }

    #[test]
    fn test_protocol_block_round_trips() {
        let report = FinalReport::new("done")
            .with_artifact("out.md", "report")
            .with_next_steps(["ship it"]);
        let block = report.to_protocol_block().unwrap();

        assert!(block.starts_with(FINAL_MARKER));
        assert_eq!(try_extract_final_report(&block), Some(report));
    }

    #[test]
    fn test_serialized_type_tag() {
        let json = serde_json::to_value(FinalReport::new("s")).unwrap();
        assert_eq!(json["type"], "final");
        assert_eq!(json["done"], true);
    }
}
