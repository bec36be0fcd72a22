use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::AppConfig;
use crate::error::RunError;
use crate::index::IndexBuilder;
use crate::protocol::FinalReport;
use crate::report;

pub const REPORT_ARTIFACT_DESCRIPTION: &str = "Project analysis report (Markdown)";

const NEXT_STEPS: &[&str] = &[
    "Attach a generative backend (OpenAI or local) and run the agent as a tool user",
    "Extend the index: chunk large repositories and add optional embeddings",
    "Serve runs asynchronously: POST /runs -> run_id, GET /runs/{id}, GET /runs/{id}/messages",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Receives progress for runs that carry an id. Persisting it is up to the
/// implementor.
pub trait RunListener: Send + Sync {
    fn on_status(&self, run_id: u64, status: RunStatus);
    fn on_message(&self, run_id: u64, role: Role, content: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub report: FinalReport,
    pub report_path: PathBuf,
}

/// Indexes a project, writes a Markdown report and describes it as a
/// [`FinalReport`]. Runs entirely locally.
pub struct AnalysisRunner {
    config: AppConfig,
    listener: Option<Arc<dyn RunListener>>,
}

impl AnalysisRunner {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            listener: None,
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn RunListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[instrument(skip(self, task), fields(project = %project_path.display()))]
    pub fn run(
        &self,
        project_path: &Path,
        task: &str,
        run_id: Option<u64>,
    ) -> Result<RunOutcome, RunError> {
        self.notify(run_id, |listener, id| listener.on_status(id, RunStatus::Running));
        self.notify(run_id, |listener, id| listener.on_message(id, Role::User, task));

        match self.execute(project_path, task, run_id) {
            Ok(outcome) => {
                self.notify(run_id, |listener, id| {
                    listener.on_message(
                        id,
                        Role::Assistant,
                        &format!("Report written to {}", outcome.report_path.display()),
                    );
                    listener.on_status(id, RunStatus::Completed);
                });
                Ok(outcome)
            }
            Err(e) => {
                error!("Run failed: {}", e);
                self.notify(run_id, |listener, id| listener.on_status(id, RunStatus::Failed));
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        project_path: &Path,
        task: &str,
        run_id: Option<u64>,
    ) -> Result<RunOutcome, RunError> {
        for dir in self.config.output_dirs() {
            std::fs::create_dir_all(dir).map_err(|source| RunError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        self.notify(run_id, |listener, id| {
            listener.on_message(
                id,
                Role::Assistant,
                &format!("Indexing project at {}", project_path.display()),
            )
        });
        let index = IndexBuilder::new(&self.config.index)?.build(project_path);
        let (report_text, summary) = report::render(&index, task).into_parts();

        let reports_dir = self
            .config
            .reports_dir
            .canonicalize()
            .unwrap_or_else(|_| self.config.reports_dir.clone());
        let report_path = reports_dir.join(report_file_name(run_id));
        std::fs::write(&report_path, report_text).map_err(|source| RunError::WriteReport {
            path: report_path.clone(),
            source,
        })?;
        info!("Wrote report to {}", report_path.display());

        let report = FinalReport::new(summary)
            .with_artifact(
                report_path.display().to_string(),
                REPORT_ARTIFACT_DESCRIPTION,
            )
            .with_next_steps(NEXT_STEPS.iter().copied());

        Ok(RunOutcome {
            report,
            report_path,
        })
    }

    fn notify<F>(&self, run_id: Option<u64>, f: F)
    where
        F: FnOnce(&dyn RunListener, u64),
    {
        if let (Some(listener), Some(id)) = (self.listener.as_deref(), run_id) {
            f(listener, id);
        }
    }
}

/// `run_<id>_report.md`, or `run_na_report.md` for anonymous runs.
pub fn report_file_name(run_id: Option<u64>) -> String {
    match run_id {
        Some(id) => format!("run_{}_report.md", id),
        None => "run_na_report.md".to_string(),
    }
}
