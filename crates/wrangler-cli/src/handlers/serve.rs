//! `wrangler serve`

use std::path::Path;

use anyhow::{Result, bail};
use tokio::sync::broadcast::error::RecvError;
use wrangler_core::{OrchestratorEvent, ServerState};

use super::{print_json, print_success};
use crate::CliContext;
use crate::presentation::describe_event;

/// Switch to `model`, then follow the server log until Ctrl-C or a crash.
///
/// Owned servers are killed when the host exits.
pub async fn execute(ctx: &CliContext, model: &Path) -> Result<()> {
    let mut events = ctx.events.subscribe();

    let switch = ctx.orchestrator.switch_model(model);
    tokio::pin!(switch);
    let state = loop {
        tokio::select! {
            result = &mut switch => break result?,
            Ok(event) = events.recv() => {
                if !ctx.json && let Some(text) = describe_event(&event) {
                    eprintln!("{text}");
                }
            }
        }
    };

    // The owned server dies with this process, so only a delegated one is
    // left behind on return.
    if matches!(state, ServerState::Foreign { .. }) {
        if ctx.json {
            return print_json(&state);
        }
        return print_success(ctx, &format!("Serving {}", state.model_name().unwrap_or_default()));
    }

    if !ctx.json {
        println!("Serving {}. Press Ctrl-C to stop.", state.model_name().unwrap_or_default());
    }
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(OrchestratorEvent::ServerCrashed { exit_code }) => bail!(
                    "server crashed{}",
                    exit_code.map(|c| format!(" with exit code {c}")).unwrap_or_default()
                ),
                Ok(event) => {
                    if !ctx.json && let Some(text) = describe_event(&event) {
                        println!("{text}");
                    }
                }
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c => break,
        }
    }

    ctx.orchestrator.shutdown().await;
    Ok(())
}
