//! `Orchestrator`: the facade hosts talk to.
//!
//! Owns the single [`ServerSupervisor`] and [`JobRegistry`] together with the
//! settings handle. Hosts construct one at their composition root and call
//! everything through it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wrangler_core::{
    ActionOutcome, ConfigHandle, EventSink, ExternalSupervisor, HttpProbe, JobId, JobSummary,
    ModelFile, OrchestratorError, ServerState, Settings, SettingsUpdate,
};

use crate::deps::{DependencyReport, check_dependencies};
use crate::jobs::{DownloadSource, JobRegistry, JobTicket};
use crate::models;
use crate::process::{ProcessLauncher, TokioLauncher};
use crate::readiness::ReqwestProbe;
use crate::reconciler;
use crate::settings_store::JsonFileSettingsStore;
use crate::supervisor::{LaunchdSupervisor, ServerSupervisor, SupervisorOptions};
use crate::toolchain::ToolchainInstaller;

pub struct Orchestrator {
    config: ConfigHandle,
    launcher: Arc<dyn ProcessLauncher>,
    sink: Arc<dyn EventSink>,
    supervisor: ServerSupervisor,
    jobs: JobRegistry,
}

impl Orchestrator {
    pub fn new(
        config: ConfigHandle,
        launcher: Arc<dyn ProcessLauncher>,
        probe: Arc<dyn HttpProbe>,
        sink: Arc<dyn EventSink>,
        options: SupervisorOptions,
    ) -> Self {
        Self {
            supervisor: ServerSupervisor::new(
                Arc::clone(&launcher),
                probe,
                Arc::clone(&sink),
                options,
            ),
            jobs: JobRegistry::new(Arc::clone(&launcher), Arc::clone(&sink)),
            config,
            launcher,
            sink,
        }
    }

    /// Production wiring with settings loaded from the data root.
    pub async fn bootstrap(sink: Arc<dyn EventSink>) -> Result<Self, OrchestratorError> {
        let store = JsonFileSettingsStore::at_default_location()?;
        info!(path = %store.path().display(), "loading settings");
        let config = ConfigHandle::load(Arc::new(store)).await?;
        Self::production(config, sink)
    }

    /// Real processes, HTTP probing and launchd delegation around `config`.
    pub fn production(config: ConfigHandle, sink: Arc<dyn EventSink>) -> Result<Self, OrchestratorError> {
        let options = SupervisorOptions::default();
        let probe = ReqwestProbe::new(options.readiness.attempt_timeout)
            .map_err(|e| OrchestratorError::spawn("readiness probe", e))?;
        let external = LaunchdSupervisor::for_current_user(&config.snapshot().alt_root)?;

        Ok(Self::new(
            config,
            Arc::new(TokioLauncher),
            Arc::new(probe),
            sink,
            options,
        )
        .with_external(Arc::new(external)))
    }

    #[must_use]
    pub fn with_external(mut self, external: Arc<dyn ExternalSupervisor>) -> Self {
        self.supervisor = self.supervisor.with_external(external);
        self
    }

    pub const fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub const fn supervisor(&self) -> &ServerSupervisor {
        &self.supervisor
    }

    pub const fn jobs(&self) -> &JobRegistry {
        &self.jobs
    }

    pub fn settings(&self) -> Settings {
        self.config.snapshot()
    }

    /// Models across every configured directory.
    pub fn list_models(&self) -> Vec<ModelFile> {
        models::scan(&models::scan_roots(&self.config.snapshot()))
    }

    pub async fn switch_model(&self, model_path: &Path) -> Result<ServerState, OrchestratorError> {
        let settings = self.config.snapshot();
        self.supervisor.switch_model(model_path, &settings).await
    }

    pub async fn stop_server(&self) {
        self.supervisor.stop().await;
    }

    /// What is serving the port: the owned server if ready, else whatever
    /// foreign server can be identified right now.
    pub async fn current_model(&self) -> Option<ServerState> {
        let state = self.supervisor.state();
        if matches!(state, ServerState::Ready { .. }) {
            return Some(state);
        }

        let port = self.config.snapshot().server_port;
        reconciler::detect_foreign_server(port)
            .await
            .map(|model_name| ServerState::Foreign { model_name })
    }

    pub fn start_download(&self, source: DownloadSource) -> Result<JobTicket, OrchestratorError> {
        self.jobs.start_download(source, &self.config.snapshot())
    }

    /// Quantize `input`, defaulting to the configured quant level.
    pub fn start_quantize(
        &self,
        input: &Path,
        quant_level: Option<&str>,
    ) -> Result<JobTicket, OrchestratorError> {
        let settings = self.config.snapshot();
        let level = quant_level.unwrap_or(&settings.default_quant_level);
        self.jobs.start_quantize(input, level, &settings)
    }

    pub async fn cancel_job(&self, id: JobId) -> Result<(), OrchestratorError> {
        self.jobs.cancel_job(id).await
    }

    pub fn list_jobs(&self) -> Vec<JobSummary> {
        self.jobs.list()
    }

    /// Delete a model file unless the owned server is serving it.
    pub fn delete_model(&self, path: &Path) -> Result<(), OrchestratorError> {
        if let Some(serving) = self.supervisor.serving_path()
            && same_file(&serving, path)
        {
            return Err(OrchestratorError::ModelInUse(path.to_path_buf()));
        }
        models::delete_model(path)?;
        info!(path = %path.display(), "deleted model");
        Ok(())
    }

    pub fn check_dependencies(&self) -> DependencyReport {
        check_dependencies(&self.config.snapshot())
    }

    /// Point at another toolchain checkout. It must contain a built server.
    pub async fn set_toolchain_root(&self, path: &Path) -> Result<Settings, OrchestratorError> {
        self.config.update_toolchain_root(path).await
    }

    pub async fn update_settings(&self, update: &SettingsUpdate) -> Result<Settings, OrchestratorError> {
        self.config.update(update).await
    }

    /// Clone and build llama.cpp into the configured toolchain root.
    pub async fn install_toolchain(&self, cancel: &CancellationToken) -> Result<PathBuf, OrchestratorError> {
        let root = self.config.snapshot().toolchain_root;
        let installer = ToolchainInstaller::new(self.launcher.as_ref(), self.sink.as_ref());
        let root = installer.install(&root, cancel).await?;
        self.config.update_toolchain_root(&root).await?;
        Ok(root)
    }

    /// Terminate the owned server and every job.
    pub async fn shutdown(&self) {
        info!("shutting down orchestrator");
        tokio::join!(self.supervisor.stop(), self.jobs.cancel_all());
    }

    /// Convert `result` into the shape handed to hosts, logging failures.
    pub fn outcome<T>(result: Result<T, OrchestratorError>) -> ActionOutcome {
        if let Err(e) = &result {
            warn!(error = %e, fatal = e.is_fatal(), "operation failed");
        }
        ActionOutcome::from(result)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("config", &self.config)
            .field("server", &self.supervisor.state())
            .field("jobs", &self.jobs)
            .finish_non_exhaustive()
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
