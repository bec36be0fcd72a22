//! Strict compilation of free-form plans into `task_spec_v1` documents.
//!
//! The backend works under an explicit JSON-only contract here, so unlike
//! [`crate::protocol`] any deviation is a hard [`ContractViolation`].

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::backend::TextBackend;
use crate::error::{
    excerpt, CompileError, ContractViolation, NOT_JSON_EXCERPT_CHARS, RAW_EXCERPT_CHARS,
};

pub const TASK_SPEC_VERSION: &str = "task_spec_v1";

/// Developer instruction sent with every plan.
pub const COMPILER_INSTRUCTION: &str = "You are a strict JSON compiler. Output MUST be valid JSON only (no prose, no markdown). \
Return a TaskSpec with this schema:
{
  \"version\":\"task_spec_v1\",
  \"goal\": string,
  \"steps\":[{\"id\":\"S1\",\"task\":string,\"verify\":[string,...]}, ...],
  \"done_criteria\":[string,...]
}
Rules:
- steps must be non-empty
- done_criteria must be non-empty
- ids must be S1..Sn
";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: String,
    pub task: String,
    pub verify: Vec<String>,
}

/// A validated plan. Field order here is the on-disk order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub version: String,
    pub goal: String,
    pub steps: Vec<Step>,
    pub done_criteria: Vec<String>,
}

impl TaskSpec {
    /// 2-space indented JSON with non-ASCII characters left as-is.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Validates raw backend output against the TaskSpec contract.
///
/// Checks run in a fixed order and the first failure wins: leading `{`
/// (before any parse attempt), JSON syntax, `version`, `goal`, `steps`,
/// `done_criteria`, then each step's shape and `S<n>` id.
pub fn validate_strict(output: &str) -> Result<TaskSpec, ContractViolation> {
    let output = output.trim();

    if !output.starts_with('{') {
        return Err(ContractViolation::NotJsonObject {
            excerpt: excerpt(output, NOT_JSON_EXCERPT_CHARS),
        });
    }

    let raw_excerpt = || excerpt(output, RAW_EXCERPT_CHARS);

    let object: Map<String, Value> =
        serde_json::from_str(output).map_err(|e| ContractViolation::InvalidJson {
            message: e.to_string(),
            excerpt: raw_excerpt(),
        })?;

    match object.get("version") {
        Some(Value::String(version)) if version == TASK_SPEC_VERSION => {}
        other => {
            return Err(ContractViolation::VersionMismatch {
                found: other.map_or_else(|| "nothing".to_string(), Value::to_string),
                excerpt: raw_excerpt(),
            })
        }
    }

    let goal = match object.get("goal") {
        Some(Value::String(goal)) if !goal.trim().is_empty() => goal.clone(),
        _ => {
            return Err(ContractViolation::MissingGoal {
                excerpt: raw_excerpt(),
            })
        }
    };

    let raw_steps = match object.get("steps") {
        Some(Value::Array(steps)) if !steps.is_empty() => steps,
        _ => {
            return Err(ContractViolation::MissingSteps {
                excerpt: raw_excerpt(),
            })
        }
    };

    let done_criteria = match object.get("done_criteria") {
        Some(Value::Array(items)) if !items.is_empty() => items,
        _ => {
            return Err(ContractViolation::MissingDoneCriteria {
                excerpt: raw_excerpt(),
            })
        }
    };
    let done_criteria = string_list(done_criteria).ok_or_else(|| {
        ContractViolation::MissingDoneCriteria {
            excerpt: raw_excerpt(),
        }
    })?;

    let mut steps = Vec::with_capacity(raw_steps.len());
    for (index, raw_step) in raw_steps.iter().enumerate() {
        let step = parse_step(index, raw_step).map_err(|reason| {
            ContractViolation::MalformedStep {
                index,
                reason,
                excerpt: raw_excerpt(),
            }
        })?;
        steps.push(step);
    }

    Ok(TaskSpec {
        version: TASK_SPEC_VERSION.to_string(),
        goal,
        steps,
        done_criteria,
    })
}

fn parse_step(index: usize, raw: &Value) -> Result<Step, String> {
    let fields = raw.as_object().ok_or("step is not an object")?;

    let expected_id = format!("S{}", index + 1);
    let id = match fields.get("id") {
        Some(Value::String(id)) if *id == expected_id => id.clone(),
        Some(other) => return Err(format!("expected id \"{}\", found {}", expected_id, other)),
        None => return Err(format!("missing id, expected \"{}\"", expected_id)),
    };

    let task = match fields.get("task") {
        Some(Value::String(task)) => task.clone(),
        _ => return Err("task must be a string".to_string()),
    };

    let verify = match fields.get("verify") {
        Some(Value::Array(items)) => string_list(items).ok_or("verify must list strings")?,
        _ => return Err("verify must be an array of strings".to_string()),
    };

    Ok(Step { id, task, verify })
}

fn string_list(items: &[Value]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

/// Compiles plans through a [`TextBackend`] and persists the result.
pub struct TaskSpecCompiler<B> {
    backend: B,
}

impl<B: TextBackend> TaskSpecCompiler<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Sends `plan` to the backend, validates the reply strictly and writes
    /// it to `out_path`, creating parent directories.
    pub async fn compile(&self, plan: &str, out_path: &Path) -> Result<TaskSpec, CompileError> {
        let response = self
            .backend
            .respond_text(COMPILER_INSTRUCTION, plan)
            .await?;

        let spec = validate_strict(&response.text).map_err(|violation| {
            warn!("TaskSpec contract violation: {}", violation);
            violation
        })?;

        write_task_spec(&spec, out_path)?;
        info!(
            "Compiled TaskSpec with {} steps to {}",
            spec.steps.len(),
            out_path.display()
        );
        Ok(spec)
    }
}

/// Writes `spec` as UTF-8 pretty JSON, creating parent directories.
pub fn write_task_spec(spec: &TaskSpec, out_path: &Path) -> Result<(), CompileError> {
    let json = spec.to_pretty_json()?;

    let io_error = |source| CompileError::Io {
        path: out_path.to_path_buf(),
        source,
    };
    if let Some(parent) = out_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(out_path, json).map_err(io_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendResponse, MockTextBackend};
    use crate::error::BackendError;
    use tempfile::TempDir;

    const MINIMAL: &str = r#"{"version":"task_spec_v1","goal":"g","steps":[{"id":"S1","task":"t","verify":[]}],"done_criteria":["d"]}"#;

    fn backend_replying(text: &'static str) -> MockTextBackend {
        let mut backend = MockTextBackend::new();
        backend
            .expect_respond_text()
            .times(1)
            .returning(move |_, _| Ok(BackendResponse::text(text)));
        backend
    }

    #[test]
    fn test_minimal_spec_validates() {
        let spec = validate_strict(MINIMAL).unwrap();
        assert_eq!(spec.version, TASK_SPEC_VERSION);
        assert_eq!(spec.goal, "g");
        assert_eq!(
            spec.steps,
            vec![Step {
                id: "S1".to_string(),
                task: "t".to_string(),
                verify: vec![],
            }]
        );
        assert_eq!(spec.done_criteria, vec!["d"]);
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert!(validate_strict(&format!("\n  {}\n", MINIMAL)).is_ok());
    }

    #[test]
    fn test_non_object_prefix_fails_before_parsing() {
        let err = validate_strict("not json").unwrap_err();
        assert_eq!(
            err,
            ContractViolation::NotJsonObject {
                excerpt: "not json".to_string()
            }
        );

        let fenced = format!("```json\n{}\n```", MINIMAL);
        assert!(matches!(
            validate_strict(&fenced),
            Err(ContractViolation::NotJsonObject { .. })
        ));
    }

    #[test]
    fn test_not_json_excerpt_is_bounded() {
        let long = "x".repeat(500);
        let err = validate_strict(&long).unwrap_err();
        assert_eq!(err.excerpt().chars().count(), NOT_JSON_EXCERPT_CHARS);
    }

    #[test]
    fn test_invalid_json() {
        let err = validate_strict("{\"version\": ").unwrap_err();
        match err {
            ContractViolation::InvalidJson { excerpt, .. } => assert_eq!(excerpt, "{\"version\":"),
            other => panic!("unexpected violation: {:?}", other),
        }
    }

    #[test]
    fn test_trailing_junk_is_invalid_json() {
        let err = validate_strict(&format!("{} and more", MINIMAL)).unwrap_err();
        assert!(matches!(err, ContractViolation::InvalidJson { .. }));
    }

    #[test]
    fn test_version_mismatch_cites_version() {
        let err = validate_strict(&MINIMAL.replace("task_spec_v1", "v2")).unwrap_err();
        assert!(matches!(err, ContractViolation::VersionMismatch { ref found, .. } if found == "\"v2\""));
        assert!(err.to_string().contains("v2"));
    }

    #[test]
    fn test_missing_version() {
        let err = validate_strict(r#"{"goal":"g"}"#).unwrap_err();
        assert!(matches!(err, ContractViolation::VersionMismatch { ref found, .. } if found == "nothing"));
    }

    #[test]
    fn test_blank_goal() {
        let err = validate_strict(&MINIMAL.replace("\"goal\":\"g\"", "\"goal\":\"  \"")).unwrap_err();
        assert!(matches!(err, ContractViolation::MissingGoal { .. }));

        let err = validate_strict(&MINIMAL.replace("\"goal\":\"g\"", "\"goal\":7")).unwrap_err();
        assert!(matches!(err, ContractViolation::MissingGoal { .. }));
    }

    #[test]
    fn test_empty_steps() {
        let raw = r#"{"version":"task_spec_v1","goal":"g","steps":[],"done_criteria":["d"]}"#;
        assert!(matches!(
            validate_strict(raw),
            Err(ContractViolation::MissingSteps { .. })
        ));
    }

    #[test]
    fn test_missing_done_criteria() {
        let raw = r#"{"version":"task_spec_v1","goal":"g","steps":[{"id":"S1","task":"t","verify":[]}]}"#;
        assert!(matches!(
            validate_strict(raw),
            Err(ContractViolation::MissingDoneCriteria { .. })
        ));

        let raw = r#"{"version":"task_spec_v1","goal":"g","steps":[{"id":"S1","task":"t","verify":[]}],"done_criteria":[]}"#;
        assert!(matches!(
            validate_strict(raw),
            Err(ContractViolation::MissingDoneCriteria { .. })
        ));
    }

    #[test]
    fn test_step_ids_must_match_position() {
        let raw = r#"{"version":"task_spec_v1","goal":"g","steps":[{"id":"S1","task":"a","verify":[]},{"id":"S3","task":"b","verify":[]}],"done_criteria":["d"]}"#;
        match validate_strict(raw).unwrap_err() {
            ContractViolation::MalformedStep { index, reason, .. } => {
                assert_eq!(index, 1);
                assert!(reason.contains("S2"));
            }
            other => panic!("unexpected violation: {:?}", other),
        }
    }

    #[test]
    fn test_step_shape_is_checked() {
        let raw = r#"{"version":"task_spec_v1","goal":"g","steps":[{"id":"S1","verify":[]}],"done_criteria":["d"]}"#;
        assert!(matches!(
            validate_strict(raw),
            Err(ContractViolation::MalformedStep { index: 0, .. })
        ));

        let raw = r#"{"version":"task_spec_v1","goal":"g","steps":[{"id":"S1","task":"t","verify":[1]}],"done_criteria":["d"]}"#;
        assert!(matches!(
            validate_strict(raw),
            Err(ContractViolation::MalformedStep { index: 0, .. })
        ));
    }

    #[test]
    fn test_pretty_json_keeps_field_order_and_unicode() {
        let spec = TaskSpec {
            version: TASK_SPEC_VERSION.to_string(),
            goal: "Überprüfe das Projekt".to_string(),
            steps: vec![Step {
                id: "S1".to_string(),
                task: "t".to_string(),
                verify: vec!["v".to_string()],
            }],
            done_criteria: vec!["d".to_string()],
        };
        let json = spec.to_pretty_json().unwrap();

        assert!(json.contains("Überprüfe"));
        assert!(json.starts_with("{\n  \"version\": \"task_spec_v1\",\n  \"goal\""));
        let goal_at = json.find("\"goal\"").unwrap();
        let steps_at = json.find("\"steps\"").unwrap();
        let done_at = json.find("\"done_criteria\"").unwrap();
        assert!(goal_at < steps_at && steps_at < done_at);
    }

    #[tokio::test]
    async fn test_compile_writes_spec() {
        let temp_dir = TempDir::new().unwrap();
        let out_path = temp_dir.path().join("nested").join("dir").join("spec.json");

        let compiler = TaskSpecCompiler::new(backend_replying(MINIMAL));
        let spec = compiler.compile("do the thing", &out_path).await.unwrap();

        let written = std::fs::read_to_string(&out_path).unwrap();
        assert_eq!(written, spec.to_pretty_json().unwrap());
        let reparsed: TaskSpec = serde_json::from_str(&written).unwrap();
        assert_eq!(reparsed, spec);
    }

    #[tokio::test]
    async fn test_compile_sends_instruction_and_plan() {
        let temp_dir = TempDir::new().unwrap();
        let mut backend = MockTextBackend::new();
        backend
            .expect_respond_text()
            .withf(|developer, user| {
                developer.to_string() == COMPILER_INSTRUCTION && user.to_string() == "my plan"
            })
            .times(1)
            .returning(|_, _| Ok(BackendResponse::text(MINIMAL)));

        let compiler = TaskSpecCompiler::new(backend);
        assert!(compiler
            .compile("my plan", &temp_dir.path().join("s.json"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_violation_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let out_path = temp_dir.path().join("spec.json");

        let compiler = TaskSpecCompiler::new(backend_replying("Sure! Here is your plan."));
        let err = compiler.compile("plan", &out_path).await.unwrap_err();

        assert!(matches!(
            err,
            CompileError::Contract(ContractViolation::NotJsonObject { .. })
        ));
        assert!(!out_path.exists());
    }

    #[tokio::test]
    async fn test_backend_failure_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let mut backend = MockTextBackend::new();
        backend
            .expect_respond_text()
            .returning(|_, _| Err(BackendError::Other("offline".to_string())));

        let compiler = TaskSpecCompiler::new(backend);
        let err = compiler
            .compile("plan", &temp_dir.path().join("s.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, CompileError::Backend(_)));
    }
}
