//! Error taxonomy surfaced at the orchestration boundary.
//!
//! Everything a host can observe from a failed operation is one of these
//! variants. The facade converts them into [`ActionOutcome`] values so that no
//! failure propagates uncaught into the host, except those flagged by
//! [`OrchestratorError::is_fatal`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{JobId, ToolRole};
use crate::paths::PathError;
use crate::ports::StoreError;
use crate::settings::SettingsError;

/// Configuration problems that require user action. Never retried automatically.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// No candidate location holds the requested executable.
    #[error(
        "{role} executable not found. Please ensure llama.cpp is built properly (searched {} locations).",
        .searched.len()
    )]
    BinaryNotFound {
        role: ToolRole,
        searched: Vec<PathBuf>,
    },

    /// A directory offered as toolchain root has no built server binary.
    #[error("{} does not contain a built llama.cpp installation", .path.display())]
    ToolchainInvalid { path: PathBuf },

    /// An interpreter needed by a helper script is not on PATH.
    #[error("{name} not found on PATH. Please install it to run download helpers.")]
    InterpreterNotFound { name: String },

    /// A helper script is missing from the scripts directory.
    #[error("Script not found: {}", .path.display())]
    ScriptNotFound { path: PathBuf },

    /// A path argument is unusable.
    #[error("Invalid path {}: {reason}", .path.display())]
    InvalidPath { path: PathBuf, reason: String },
}

impl ConfigurationError {
    /// Short machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::BinaryNotFound { .. } => "BinaryNotFound",
            Self::ToolchainInvalid { .. } => "ToolchainInvalid",
            Self::InterpreterNotFound { .. } => "InterpreterNotFound",
            Self::ScriptNotFound { .. } => "ScriptNotFound",
            Self::InvalidPath { .. } => "InvalidPath",
        }
    }
}

/// Errors returned by orchestrator operations.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The spawned server never answered its readiness probe. The process is
    /// left running so its log can be inspected.
    #[error(
        "Server failed to start on port {port} after {attempts} readiness attempts. Check the server log for error messages."
    )]
    StartupTimeout { port: u16, attempts: u32 },

    /// The spawned server exited before answering its readiness probe.
    #[error(
        "Server exited during startup{}. Check the server log for error messages.",
        .exit_code.map(|c| format!(" with exit code {c}")).unwrap_or_default()
    )]
    ServerExited { exit_code: Option<i32> },

    /// The OS service manager could not confirm a delegated restart.
    #[error("Failed to restart the managed server: {0}")]
    ExternalRestartFailed(String),

    /// A toolchain install step did not complete.
    #[error("Toolchain install failed during {step}: {reason}")]
    InstallFailed { step: String, reason: String },

    /// An executable could not be launched.
    #[error("Failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    /// The quantize target already exists; nothing was spawned.
    #[error("Model with {quant_level} quantization already exists: {}", .path.display())]
    OutputAlreadyExists { path: PathBuf, quant_level: String },

    #[error("No running job with id {0}")]
    JobNotFound(JobId),

    #[error("Model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    /// The model is loaded by the owned server.
    #[error("Model is currently being served: {}", .0.display())]
    ModelInUse(PathBuf),

    /// The server port is held by a process this orchestrator does not own.
    #[error("Port {port} is already in use{}", .holder.as_ref().map(|h| format!(" by {h}")).unwrap_or_default())]
    PortInUse { port: u16, holder: Option<String> },

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrchestratorError {
    /// Whether the host should terminate rather than keep running.
    ///
    /// A port held by an unrelated process cannot be reclaimed: the
    /// orchestrator never kills foreign processes, and a readiness probe against
    /// the port would answer for the wrong server.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::PortInUse { .. })
    }

    /// Whether the error needs the user to fix configuration.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::Configuration(_) | Self::Settings(_) | Self::Path(_)
        )
    }

    pub fn spawn(program: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Spawn {
            program: program.into(),
            reason: reason.to_string(),
        }
    }
}

/// `{success, error?}` result handed to hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    pub const fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

impl<T> From<Result<T, OrchestratorError>> for ActionOutcome {
    fn from(result: Result<T, OrchestratorError>) -> Self {
        match result {
            Ok(_) => Self::ok(),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_not_found_is_configuration_error() {
        let err: OrchestratorError = ConfigurationError::BinaryNotFound {
            role: ToolRole::Server,
            searched: vec![PathBuf::from("/a"), PathBuf::from("/b")],
        }
        .into();
        assert!(err.is_configuration());
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("llama-server executable not found"));
    }

    #[test]
    fn port_in_use_is_fatal() {
        let err = OrchestratorError::PortInUse {
            port: 7070,
            holder: Some("nginx".to_string()),
        };
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "Port 7070 is already in use by nginx");
    }

    #[test]
    fn outcome_from_result() {
        let ok: ActionOutcome = Ok::<(), OrchestratorError>(()).into();
        assert!(ok.success);

        let failed: ActionOutcome =
            Err::<(), _>(OrchestratorError::JobNotFound(JobId::new())).into();
        assert!(!failed.success);
        let json = serde_json::to_string(&ActionOutcome::ok()).unwrap();
        assert_eq!(json, "{\"success\":true}");
        assert!(failed.error.unwrap().starts_with("No running job"));
    }
}
