use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Bounded project indexing and structured-protocol validation for
/// LLM-driven analysis runs.
#[derive(Parser, Debug)]
#[command(name = "repobrief", version, about)]
pub struct Cli {
    /// Configuration file (defaults to ./repobrief.toml when present)
    #[arg(long, global = true, env = "REPOBRIEF_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a project, write a Markdown report and print its summary
    Analyze(AnalyzeArgs),

    /// Build a project index and print it
    Index(IndexArgs),

    /// Extract a FINAL_REPORT payload from model output
    Extract(ExtractArgs),

    /// Compile a free-form plan into a task_spec_v1 JSON file
    CompilePlan(CompilePlanArgs),

    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Project directory to analyze
    pub path: PathBuf,

    /// Task description recorded in the report
    #[arg(short, long, default_value = "")]
    pub task: String,

    /// Run identifier used in the report file name
    #[arg(long)]
    pub run_id: Option<u64>,
}

#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Project directory to index
    pub path: PathBuf,

    /// Print the index as JSON instead of a Markdown report
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// File holding the model output (reads stdin when omitted)
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct CompilePlanArgs {
    /// File holding the free-form plan
    pub plan_file: PathBuf,

    /// Where to write the TaskSpec JSON
    #[arg(short, long)]
    pub out: PathBuf,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Print as TOML instead of JSON
    #[arg(long)]
    pub toml: bool,
}
