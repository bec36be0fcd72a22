use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use colored::Colorize;
use tokio::fs;
use tracing::info;

use crate::{
    backend::OpenAiBackend,
    cli_types::{AnalyzeArgs, CompilePlanArgs, ConfigArgs, ExtractArgs, IndexArgs},
    config::AppConfig,
    index::IndexBuilder,
    protocol::try_extract_final_report,
    report,
    runner::{AnalysisRunner, Role, RunListener, RunStatus},
    taskspec::TaskSpecCompiler,
};

pub struct CliApp {
    config: AppConfig,
    verbose: bool,
}

impl CliApp {
    pub fn new(config: AppConfig, verbose: bool) -> Self {
        info!("Initializing repobrief CLI");
        Self { config, verbose }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub async fn analyze(&self, args: AnalyzeArgs) -> Result<()> {
        let start_time = Instant::now();
        print_header("Project Analysis");

        let mut runner = AnalysisRunner::new(self.config.clone());
        if self.verbose {
            runner = runner.with_listener(Arc::new(ConsoleListener));
        }

        let outcome = runner
            .run(&args.path, &args.task, args.run_id)
            .with_context(|| format!("Analysis of {} failed", args.path.display()))?;

        println!("{}", outcome.report.summary);
        println!();
        print_success(&format!(
            "Report written to {} in {:.2?}",
            outcome.report_path.display(),
            start_time.elapsed()
        ));
        Ok(())
    }

    pub async fn index(&self, args: IndexArgs) -> Result<()> {
        let builder = IndexBuilder::new(&self.config.index)
            .context("Failed to create index builder")?;
        let index = builder.build(&args.path);

        if args.json {
            let json = serde_json::to_string_pretty(&index)
                .context("Failed to serialize project index")?;
            println!("{}", json);
        } else {
            println!("{}", report::render_report(&index, ""));
        }
        Ok(())
    }

    /// Returns whether a FINAL_REPORT payload was found.
    pub async fn extract(&self, args: ExtractArgs) -> Result<bool> {
        let text = match &args.file {
            Some(path) => fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?,
            None => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("Failed to read stdin")?;
                buffer
            }
        };

        match try_extract_final_report(&text) {
            Some(report) => {
                let json = serde_json::to_string_pretty(&report)
                    .context("Failed to serialize final report")?;
                println!("{}", json);
                Ok(true)
            }
            None => {
                print_warning("No valid FINAL_REPORT block found");
                Ok(false)
            }
        }
    }

    pub async fn compile_plan(&self, args: CompilePlanArgs) -> Result<()> {
        let plan = fs::read_to_string(&args.plan_file)
            .await
            .with_context(|| format!("Failed to read plan {}", args.plan_file.display()))?;

        let backend = OpenAiBackend::from_config(&self.config.backend)
            .context("Failed to create OpenAI backend")?;
        if self.verbose {
            print_info(&format!("Compiling with model {}", backend.model()));
        }

        let spec = TaskSpecCompiler::new(backend)
            .compile(&plan, &args.out)
            .await
            .context("Failed to compile plan")?;

        print_success(&format!(
            "TaskSpec with {} steps written to {}",
            spec.steps.len(),
            args.out.display()
        ));
        Ok(())
    }

    pub fn show_config(&self, args: ConfigArgs) -> Result<()> {
        let rendered = if args.toml {
            toml::to_string_pretty(&self.config).context("Failed to render configuration")?
        } else {
            serde_json::to_string_pretty(&self.config).context("Failed to render configuration")?
        };
        println!("{}", rendered);
        Ok(())
    }
}

/// Echoes run progress to stderr in verbose mode.
struct ConsoleListener;

impl RunListener for ConsoleListener {
    fn on_status(&self, run_id: u64, status: RunStatus) {
        let label = format!("{:?}", status).to_lowercase();
        let label = match status {
            RunStatus::Running => label.yellow(),
            RunStatus::Completed => label.green(),
            RunStatus::Failed => label.red(),
        };
        eprintln!("{} run {} {}", "•".dimmed(), run_id, label);
    }

    fn on_message(&self, run_id: u64, role: Role, content: &str) {
        let who = match role {
            Role::User => "user".cyan(),
            Role::Assistant => "assistant".magenta(),
        };
        eprintln!("{} run {} {}: {}", "•".dimmed(), run_id, who, content);
    }
}

fn print_header(title: &str) {
    println!("{}", title.bold().underline());
}

fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message);
}

fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Loads configuration for the binary, naming the file in the error.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    AppConfig::load(path).with_context(|| match path {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })
}
