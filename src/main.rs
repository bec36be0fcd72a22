use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use repobrief::cli::{load_config, CliApp};
use repobrief::cli_types::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    let config = load_config(cli.config.as_deref())?;
    let app = CliApp::new(config, cli.verbose);

    match cli.command {
        Commands::Analyze(args) => app.analyze(args).await?,
        Commands::Index(args) => app.index(args).await?,
        Commands::Extract(args) => {
            if !app.extract(args).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::CompilePlan(args) => app.compile_plan(args).await?,
        Commands::Config(args) => app.show_config(args)?,
    }

    Ok(ExitCode::SUCCESS)
}

// Logs go to stderr so stdout stays clean for JSON output.
fn init_logging(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "repobrief=debug"
        } else {
            "repobrief=info"
        })
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
