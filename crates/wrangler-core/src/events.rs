//! Canonical event union pushed to hosts through an [`EventSink`].
//!
//! The orchestrator never knows who listens. Hosts render these events (a
//! terminal, a window, an SSE stream) and simply stop listening when they go
//! away.
//!
//! # Wire Format
//!
//! Events are serialized with a `type` tag:
//!
//! ```json
//! { "type": "jobPercent", "id": "…", "percent": 42 }
//! ```
//!
//! [`EventSink`]: crate::ports::EventSink

use serde::{Deserialize, Serialize};

use crate::domain::{JobId, JobKind, JobOutcome, ServerState};

/// Origin of a child-process output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

impl OutputStream {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl std::fmt::Display for OutputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the server supervisor and the job registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OrchestratorEvent {
    /// The supervisor moved to a new state.
    ServerState { state: ServerState },

    /// One line of server output.
    ServerLog { stream: OutputStream, line: String },

    /// The owned server answered its readiness probe.
    #[serde(rename_all = "camelCase")]
    ServerReady {
        model_name: String,
        pid: u32,
        port: u16,
    },

    /// The owned server process exited (the `server-stopped` notification).
    #[serde(rename_all = "camelCase")]
    ServerStopped { exit_code: Option<i32> },

    /// The owned server exited without being asked to.
    #[serde(rename_all = "camelCase")]
    ServerCrashed { exit_code: Option<i32> },

    /// A background job was accepted and its process spawned.
    JobStarted {
        id: JobId,
        kind: JobKind,
        target: String,
    },

    /// A verbatim stdout line from a job.
    JobProgress { id: JobId, line: String },

    /// A percentage parsed from a job's progress output.
    JobPercent { id: JobId, percent: u8 },

    /// An error signal observed on a job's stderr while it keeps running.
    JobError { id: JobId, message: String },

    /// Terminal status of a job, emitted exactly once per job.
    JobDone { outcome: JobOutcome },

    /// Output from a toolchain install step.
    ToolchainLog { line: String },
}

impl OrchestratorEvent {
    pub const fn server_state(state: ServerState) -> Self {
        Self::ServerState { state }
    }

    pub fn server_log(stream: OutputStream, line: impl Into<String>) -> Self {
        Self::ServerLog {
            stream,
            line: line.into(),
        }
    }

    pub fn job_progress(id: JobId, line: impl Into<String>) -> Self {
        Self::JobProgress {
            id,
            line: line.into(),
        }
    }

    pub fn job_error(id: JobId, message: impl Into<String>) -> Self {
        Self::JobError {
            id,
            message: message.into(),
        }
    }

    /// Job this event belongs to, if any.
    pub const fn job_id(&self) -> Option<JobId> {
        match self {
            Self::JobStarted { id, .. }
            | Self::JobProgress { id, .. }
            | Self::JobPercent { id, .. }
            | Self::JobError { id, .. } => Some(*id),
            Self::JobDone { outcome } => Some(outcome.id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_event_serialization() {
        let id = JobId::new();
        let json = serde_json::to_string(&OrchestratorEvent::JobPercent { id, percent: 42 }).unwrap();
        assert!(json.contains("\"type\":\"jobPercent\""));
        assert!(json.contains("\"percent\":42"));
    }

    #[test]
    fn server_stopped_carries_exit_code() {
        let json =
            serde_json::to_string(&OrchestratorEvent::ServerStopped { exit_code: Some(1) }).unwrap();
        assert!(json.contains("\"type\":\"serverStopped\""));
        assert!(json.contains("\"exitCode\":1"));
    }

    #[test]
    fn job_id_is_extracted() {
        let id = JobId::new();
        assert_eq!(OrchestratorEvent::job_progress(id, "10%").job_id(), Some(id));
        assert_eq!(
            OrchestratorEvent::server_log(OutputStream::Stderr, "x").job_id(),
            None
        );
    }
}
