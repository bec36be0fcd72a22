pub mod backend;
pub mod cli;
pub mod cli_types;
pub mod config;
pub mod error;
pub mod index;
pub mod protocol;
pub mod report;
pub mod runner;
pub mod scanner;
pub mod taskspec;

// Re-export commonly used types
pub use backend::{BackendResponse, OpenAiBackend, ScriptedBackend, TextBackend};
pub use cli::CliApp;
pub use config::{AppConfig, BackendConfig, IndexConfig};
pub use error::{BackendError, CompileError, ConfigError, ContractViolation, RunError};
pub use index::{build_index, IndexBuilder, IndexedFile, ProjectIndex};
pub use protocol::{try_extract_final_report, ArtifactOut, FinalReport};
pub use report::{render, RenderedReport};
pub use runner::{AnalysisRunner, Role, RunListener, RunOutcome, RunStatus};
pub use scanner::{ImportanceRanker, RepositoryScanner, ScanResult};
pub use taskspec::{validate_strict, Step, TaskSpec, TaskSpecCompiler, TASK_SPEC_VERSION};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
