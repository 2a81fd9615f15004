//! CLI entry point and composition root.
//!
//! Errors leave with exit code 1, or 2 when the orchestrator reports a
//! fatal condition such as an occupied port.

use std::process::ExitCode;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;
use wrangler_cli::{Cli, Commands, SettingsOverrides, bootstrap, handlers};
use wrangler_core::{ActionOutcome, OrchestratorError};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                if let Ok(text) = serde_json::to_string(&ActionOutcome::failed(format!("{e:#}"))) {
                    println!("{text}");
                }
            } else {
                eprintln!("Error: {e:#}");
            }
            let fatal = e
                .downcast_ref::<OrchestratorError>()
                .is_some_and(OrchestratorError::is_fatal);
            ExitCode::from(if fatal { 2 } else { 1 })
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let overrides = SettingsOverrides {
        port: cli.port,
        toolchain: cli.toolchain,
    };
    let ctx = bootstrap(overrides, cli.json).await?;

    match command {
        Commands::Models => handlers::models::execute(&ctx),
        Commands::Status => handlers::status::execute(&ctx).await,
        Commands::Serve { model } => handlers::serve::execute(&ctx, &model).await,
        Commands::Download { source } => handlers::jobs::download(&ctx, source).await,
        Commands::Quantize { model, level } => {
            handlers::jobs::quantize(&ctx, &model, level.as_deref()).await
        }
        Commands::Delete { model } => handlers::delete::execute(&ctx, &model),
        Commands::CheckDeps => handlers::check_deps::execute(&ctx),
        Commands::Config { command } => handlers::config::execute(&ctx, command).await,
        Commands::Toolchain { command } => handlers::toolchain::execute(&ctx, command).await,
    }
}
