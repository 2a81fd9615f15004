//! Delegation to a launchd-managed server (macOS).
//!
//! When the Metal server is installed as a LaunchAgent, launchd owns the
//! process. Switching models then means placing the model where the agent
//! looks, writing its preferred-model marker and asking launchd to restart it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use wrangler_core::{ExternalSupervisor, OrchestratorError, PathError};

/// launchd label of the managed server.
pub const AGENT_LABEL: &str = "com.llama.mps.server";

/// Pause between the fallback `stop` and `start`.
const FALLBACK_RESTART_PAUSE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct LaunchdSupervisor {
    plist_path: PathBuf,
    models_dir: PathBuf,
    preference_file: PathBuf,
    restart_wait: Duration,
}

impl LaunchdSupervisor {
    /// Supervisor for the agent installed for the current user.
    ///
    /// `alt_root` is the Metal install whose `models` directory the agent
    /// serves from.
    pub fn for_current_user(alt_root: &Path) -> Result<Self, PathError> {
        let home = dirs::home_dir().ok_or(PathError::NoHomeDir)?;
        Ok(Self {
            plist_path: home
                .join("Library/LaunchAgents")
                .join(format!("{AGENT_LABEL}.plist")),
            models_dir: alt_root.join("models"),
            preference_file: home.join(".config/llama_mps_server/preferred_model"),
            restart_wait: Duration::from_secs(3),
        })
    }

    /// Copy the model next to the agent's models unless it is already there.
    async fn stage_model(&self, model_path: &Path, file_name: &str) -> Result<(), OrchestratorError> {
        let target = self.models_dir.join(file_name);
        if target == model_path || tokio::fs::try_exists(&target).await.unwrap_or(false) {
            return Ok(());
        }

        tokio::fs::create_dir_all(&self.models_dir).await?;
        info!(from = %model_path.display(), to = %target.display(), "copying model for managed server");
        tokio::fs::copy(model_path, &target).await?;
        Ok(())
    }

    async fn write_preference(&self, file_name: &str) -> Result<(), OrchestratorError> {
        if let Some(parent) = self.preference_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.preference_file, file_name).await?;
        Ok(())
    }

    async fn restart_agent(&self) -> Result<(), OrchestratorError> {
        let target = format!("gui/{}/{AGENT_LABEL}", current_uid());
        if launchctl(&["kickstart", "-k", &target]).await {
            return Ok(());
        }

        warn!("launchctl kickstart failed, falling back to stop/start");
        if !launchctl(&["stop", AGENT_LABEL]).await {
            return Err(OrchestratorError::ExternalRestartFailed(
                "launchctl stop failed".to_string(),
            ));
        }
        sleep(FALLBACK_RESTART_PAUSE).await;
        if !launchctl(&["start", AGENT_LABEL]).await {
            return Err(OrchestratorError::ExternalRestartFailed(
                "launchctl start failed".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ExternalSupervisor for LaunchdSupervisor {
    fn is_active(&self) -> bool {
        cfg!(target_os = "macos") && self.plist_path.exists()
    }

    async fn switch_model(&self, model_path: &Path) -> Result<String, OrchestratorError> {
        let file_name = model_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| OrchestratorError::ModelNotFound(model_path.to_path_buf()))?;

        self.stage_model(model_path, &file_name).await?;
        self.write_preference(&file_name).await?;
        self.restart_agent().await?;

        // launchd returns before the server has reloaded.
        sleep(self.restart_wait).await;
        info!(model = %file_name, "managed server restarted");
        Ok(file_name)
    }
}

async fn launchctl(args: &[&str]) -> bool {
    match Command::new("launchctl").args(args).output().await {
        Ok(output) if output.status.success() => true,
        Ok(output) => {
            debug!(
                ?args,
                status = ?output.status.code(),
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "launchctl failed"
            );
            false
        }
        Err(e) => {
            debug!(?args, error = %e, "launchctl could not be run");
            false
        }
    }
}

#[cfg(unix)]
fn current_uid() -> u32 {
    nix::unistd::getuid().as_raw()
}

#[cfg(not(unix))]
const fn current_uid() -> u32 {
    0
}
