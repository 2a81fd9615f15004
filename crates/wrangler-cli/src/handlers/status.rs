//! `wrangler status`

use anyhow::Result;
use wrangler_core::ServerState;

use super::print_json;
use crate::CliContext;

pub async fn execute(ctx: &CliContext) -> Result<()> {
    let current = ctx.orchestrator.current_model().await;
    if ctx.json {
        return print_json(&current.unwrap_or(ServerState::Stopped));
    }

    let port = ctx.orchestrator.settings().server_port;
    match current {
        Some(ServerState::Foreign { model_name }) => {
            println!("Port {port}: {model_name} (external server, not managed by wrangler)");
        }
        Some(state) => println!("Port {port}: {state}"),
        None => println!("Port {port}: no server running"),
    }
    Ok(())
}
