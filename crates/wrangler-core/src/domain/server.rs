//! Observable state of the inference server.

use serde::{Deserialize, Serialize};

/// Server lifecycle state as observed by hosts.
///
/// Every variant except `Foreign` is owned by the server supervisor. `Foreign`
/// is a read-only projection of a server this orchestrator did not spawn (or
/// one managed by an OS service manager) and never takes part in the
/// supervisor's transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ServerState {
    /// No owned server is running.
    #[default]
    Stopped,
    /// The previous server is being terminated.
    Stopping,
    /// The server binary is being resolved.
    Locating,
    /// The server process is being spawned.
    Starting,
    /// Waiting for the readiness endpoint to answer.
    Probing,
    /// The owned server answered its readiness probe.
    #[serde(rename_all = "camelCase")]
    Ready { model_name: String, pid: u32 },
    /// The owned server exited without being asked to.
    #[serde(rename_all = "camelCase")]
    Crashed { exit_code: Option<i32> },
    /// A server not owned by this orchestrator is serving the port.
    #[serde(rename_all = "camelCase")]
    Foreign { model_name: String },
}

impl ServerState {
    /// Whether a switch is currently moving through its intermediate steps.
    pub const fn is_transitioning(&self) -> bool {
        matches!(
            self,
            Self::Stopping | Self::Locating | Self::Starting | Self::Probing
        )
    }

    /// Whether the owned server is ready.
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Model name currently served, owned or foreign.
    pub fn model_name(&self) -> Option<&str> {
        match self {
            Self::Ready { model_name, .. } | Self::Foreign { model_name } => Some(model_name),
            _ => None,
        }
    }
}

impl std::fmt::Display for ServerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stopped => f.write_str("stopped"),
            Self::Stopping => f.write_str("stopping"),
            Self::Locating => f.write_str("locating binary"),
            Self::Starting => f.write_str("starting"),
            Self::Probing => f.write_str("waiting for readiness"),
            Self::Ready { model_name, pid } => write!(f, "ready ({model_name}, pid {pid})"),
            Self::Crashed {
                exit_code: Some(code),
            } => write!(f, "crashed (exit code {code})"),
            Self::Crashed { exit_code: None } => f.write_str("crashed (killed by signal)"),
            Self::Foreign { model_name } => write!(f, "external server ({model_name})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_state_serializes_with_status_tag() {
        let state = ServerState::Ready {
            model_name: "mistral-Q4_0.gguf".to_string(),
            pid: 42,
        };
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"status\":\"ready\""));
        assert!(json.contains("\"modelName\":\"mistral-Q4_0.gguf\""));
    }

    #[test]
    fn foreign_state_exposes_model_name() {
        let state = ServerState::Foreign {
            model_name: "phi.gguf".to_string(),
        };
        assert_eq!(state.model_name(), Some("phi.gguf"));
        assert!(!state.is_ready());
        assert!(!state.is_transitioning());
    }
}
