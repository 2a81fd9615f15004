//! `wrangler toolchain install`

use anyhow::Result;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use wrangler_core::OrchestratorEvent;

use super::print_success;
use crate::CliContext;
use crate::commands::ToolchainCommand;

pub async fn execute(ctx: &CliContext, command: ToolchainCommand) -> Result<()> {
    match command {
        ToolchainCommand::Install => install(ctx).await,
    }
}

async fn install(ctx: &CliContext) -> Result<()> {
    let cancel = CancellationToken::new();
    let mut events = ctx.events.subscribe();
    let quiet = ctx.json;

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(OrchestratorEvent::ToolchainLog { line }) if !quiet => println!("{line}"),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });

    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let result = ctx.orchestrator.install_toolchain(&cancel).await;
    watcher.abort();
    printer.abort();

    let root = result?;
    print_success(ctx, &format!("✓ llama.cpp installed at {}", root.display()))
}
