//! CLI composition root.
//!
//! Loads settings, applies per-invocation overrides and wires the
//! production `Orchestrator` to a broadcast sink the handlers subscribe to.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;
use wrangler_core::{ConfigHandle, SettingsStore, validate_settings};
use wrangler_runtime::{BroadcastSink, JsonFileSettingsStore, Orchestrator};

/// Values from global flags that apply to this invocation only.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub port: Option<u16>,
    pub toolchain: Option<PathBuf>,
}

/// Everything a handler needs.
pub struct CliContext {
    pub orchestrator: Arc<Orchestrator>,
    pub events: BroadcastSink,
    pub json: bool,
}

pub async fn bootstrap(overrides: SettingsOverrides, json: bool) -> Result<CliContext> {
    let store = JsonFileSettingsStore::at_default_location()?;
    debug!(path = %store.path().display(), "loading settings");
    let mut settings = store
        .load()
        .await
        .with_context(|| format!("Failed to load {}", store.path().display()))?;

    if let Some(port) = overrides.port {
        settings.server_port = port;
    }
    if let Some(toolchain) = overrides.toolchain {
        settings.toolchain_root = toolchain;
    }
    validate_settings(&settings)?;

    let events = BroadcastSink::new();
    let config = ConfigHandle::with_settings(Arc::new(store), settings);
    let orchestrator = Orchestrator::production(config, Arc::new(events.clone()))?;

    Ok(CliContext {
        orchestrator: Arc::new(orchestrator),
        events,
        json,
    })
}
