//! Server supervisor: owns the single inference server process.
//!
//! Switches are serialized through a FIFO lock. A switch stops the owned
//! server, waits for the port to settle, locates the binary, spawns the new
//! server and probes it until it answers. Unexpected exits are picked up by a
//! per-process crash listener.

mod delegation;
mod invocation;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};
use wrangler_core::{
    ConfigurationError, EventSink, ExternalSupervisor, HttpProbe, OrchestratorError,
    OrchestratorEvent, ServerState, Settings, ToolRole,
};

pub use delegation::{AGENT_LABEL, LaunchdSupervisor};
pub use invocation::{CUDA_TOOLKIT_MARKER, ServerInvocation, gpu_offload_available};

use crate::locator;
use crate::process::{ExitInfo, ProcessHandle, ProcessLauncher, is_port_available};
use crate::readiness::{RetryPolicy, models_listing_ready, wait_ready};
use crate::reconciler;

/// Tunables for the switch sequence.
#[derive(Debug, Clone, Copy)]
pub struct SupervisorOptions {
    /// Pause after stopping the previous server before the port is reused.
    pub settle_delay: Duration,
    pub readiness: RetryPolicy,
    /// Offload layers to the GPU. Detected from the host by default.
    pub gpu_offload: bool,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_secs(2),
            readiness: RetryPolicy::default(),
            gpu_offload: gpu_offload_available(),
        }
    }
}

struct OwnedServer {
    handle: ProcessHandle,
    model_path: PathBuf,
    generation: u64,
}

#[derive(Default)]
struct Inner {
    state: ServerState,
    owned: Option<OwnedServer>,
    generation: u64,
}

/// State shared with crash listeners.
struct Shared {
    inner: Mutex<Inner>,
    sink: Arc<dyn EventSink>,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ServerState) {
        self.lock().state = state.clone();
        debug!(state = %state, "server state changed");
        self.sink.emit(OrchestratorEvent::server_state(state));
    }

    fn take_owned(&self) -> Option<OwnedServer> {
        self.lock().owned.take()
    }

    /// Record the exit of the server started as `generation`.
    ///
    /// Does nothing unless that server is still the owned one, so a late exit
    /// of a replaced server never clobbers its successor. Returns whether the
    /// exit was handled here.
    fn handle_exit(&self, generation: u64, info: ExitInfo) -> bool {
        {
            let mut inner = self.lock();
            if inner.owned.as_ref().map(|o| o.generation) != Some(generation) {
                return false;
            }
            inner.owned = None;
        }

        self.sink.emit(OrchestratorEvent::ServerStopped {
            exit_code: info.code,
        });
        if info.requested {
            self.set_state(ServerState::Stopped);
        } else {
            warn!(exit_code = ?info.code, "server exited unexpectedly");
            self.sink.emit(OrchestratorEvent::ServerCrashed {
                exit_code: info.code,
            });
            self.set_state(ServerState::Crashed {
                exit_code: info.code,
            });
        }
        true
    }
}

pub struct ServerSupervisor {
    launcher: Arc<dyn ProcessLauncher>,
    probe: Arc<dyn HttpProbe>,
    external: Option<Arc<dyn ExternalSupervisor>>,
    options: SupervisorOptions,
    switch_lock: tokio::sync::Mutex<()>,
    shared: Arc<Shared>,
}

impl ServerSupervisor {
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        probe: Arc<dyn HttpProbe>,
        sink: Arc<dyn EventSink>,
        options: SupervisorOptions,
    ) -> Self {
        Self {
            launcher,
            probe,
            external: None,
            options,
            switch_lock: tokio::sync::Mutex::new(()),
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                sink,
            }),
        }
    }

    /// Hand switches to an OS service manager whenever it reports active.
    #[must_use]
    pub fn with_external(mut self, external: Arc<dyn ExternalSupervisor>) -> Self {
        self.external = Some(external);
        self
    }

    pub fn state(&self) -> ServerState {
        self.shared.lock().state.clone()
    }

    /// Model file loaded by the owned server, if one is running.
    pub fn serving_path(&self) -> Option<PathBuf> {
        self.shared
            .lock()
            .owned
            .as_ref()
            .map(|owned| owned.model_path.clone())
    }

    /// PID of the owned server process.
    pub fn owned_pid(&self) -> Option<u32> {
        self.shared.lock().owned.as_ref().map(|o| o.handle.pid())
    }

    /// Switch the server to `model_path` and wait until it is ready.
    ///
    /// Concurrent calls are queued and run one after another.
    pub async fn switch_model(
        &self,
        model_path: &Path,
        settings: &Settings,
    ) -> Result<ServerState, OrchestratorError> {
        let _switch = self.switch_lock.lock().await;
        let model_name = model_file_name(model_path)?;

        if let Some(external) = self.external.as_ref().filter(|e| e.is_active()) {
            info!(model = %model_name, "delegating model switch to service manager");
            // The service takes over the port.
            if self.stop_owned(Duration::ZERO).await {
                self.shared.set_state(ServerState::Stopped);
            }
            let served = external.switch_model(model_path).await?;
            return Ok(ServerState::Foreign { model_name: served });
        }

        self.stop_owned(self.options.settle_delay).await;

        match self.start_owned(model_path, &model_name, settings).await {
            Ok(state) => Ok(state),
            Err(e) => {
                // A crash during startup already recorded `Crashed`.
                if !matches!(e, OrchestratorError::ServerExited { .. }) {
                    self.shared.set_state(ServerState::Stopped);
                }
                Err(e)
            }
        }
    }

    /// Stop the owned server, if any.
    pub async fn stop(&self) {
        let _switch = self.switch_lock.lock().await;
        if self.stop_owned(Duration::ZERO).await {
            self.shared.set_state(ServerState::Stopped);
        }
    }

    /// Terminate the owned server, then wait `settle` before the port is
    /// reused. Returns whether a server was running.
    async fn stop_owned(&self, settle: Duration) -> bool {
        let Some(previous) = self.shared.take_owned() else {
            return false;
        };

        self.shared.set_state(ServerState::Stopping);
        let pid = previous.handle.pid();
        let info = previous.handle.terminate().await;
        info!(pid = %pid, exit_code = ?info.code, "stopped server");
        self.shared.sink.emit(OrchestratorEvent::ServerStopped {
            exit_code: info.code,
        });

        if !settle.is_zero() {
            sleep(settle).await;
        }
        true
    }

    async fn start_owned(
        &self,
        model_path: &Path,
        model_name: &str,
        settings: &Settings,
    ) -> Result<ServerState, OrchestratorError> {
        let port = settings.server_port;

        self.shared.set_state(ServerState::Locating);
        let binary = locator::locate(
            ToolRole::Server,
            &[&settings.toolchain_root, &settings.alt_root],
        )
        .map_err(ConfigurationError::from)?;

        if !is_port_available(port) {
            let holder = reconciler::port_holder(port).await;
            return Err(OrchestratorError::PortInUse {
                port,
                holder: holder.map(|h| h.to_string()),
            });
        }

        self.shared.set_state(ServerState::Starting);
        let spec = ServerInvocation::new(&binary, model_path, port)
            .context_size(settings.context_size)
            .gpu_offload(self.options.gpu_offload)
            .build();
        let mut handle = self.launcher.launch(&spec)?;
        let pid = handle.pid();
        info!(pid = %pid, port = %port, model = %model_name, binary = %binary.display(), "started server");

        if let Some(mut output) = handle.take_output() {
            let sink = Arc::clone(&self.shared.sink);
            tokio::spawn(async move {
                while let Some(line) = output.next_line().await {
                    sink.emit(OrchestratorEvent::server_log(line.stream, line.line));
                }
            });
        }

        let mut exit = handle.exit_watcher();
        let generation = {
            let mut inner = self.shared.lock();
            inner.generation += 1;
            let generation = inner.generation;
            inner.owned = Some(OwnedServer {
                handle,
                model_path: model_path.to_path_buf(),
                generation,
            });
            generation
        };

        let listener = Arc::clone(&self.shared);
        let mut crash_watch = exit.clone();
        tokio::spawn(async move {
            let info = crash_watch.wait().await;
            listener.handle_exit(generation, info);
        });

        self.shared.set_state(ServerState::Probing);
        let url = settings.readiness_url();
        let policy = self.options.readiness;

        tokio::select! {
            ready = wait_ready(self.probe.as_ref(), &url, models_listing_ready, policy) => {
                if ready {
                    let state = ServerState::Ready {
                        model_name: model_name.to_string(),
                        pid,
                    };
                    self.shared.set_state(state.clone());
                    self.shared.sink.emit(OrchestratorEvent::ServerReady {
                        model_name: model_name.to_string(),
                        pid,
                        port,
                    });
                    Ok(state)
                } else {
                    // Left running so its log can be inspected.
                    warn!(pid = %pid, port = %port, "server did not become ready");
                    Err(OrchestratorError::StartupTimeout {
                        port,
                        attempts: policy.max_attempts,
                    })
                }
            }
            info = exit.wait() => {
                self.shared.handle_exit(generation, info);
                Err(OrchestratorError::ServerExited { exit_code: info.code })
            }
        }
    }
}

fn model_file_name(model_path: &Path) -> Result<String, OrchestratorError> {
    model_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| OrchestratorError::ModelNotFound(model_path.to_path_buf()))
}
