//! Rendering of orchestrator events.

use indicatif::{ProgressBar, ProgressStyle};
use wrangler_core::{JobStatus, OrchestratorEvent};

/// One-line description of an event, or `None` for events rendered elsewhere.
pub fn describe_event(event: &OrchestratorEvent) -> Option<String> {
    match event {
        OrchestratorEvent::ServerState { state } => Some(format!("[server] {state}")),
        OrchestratorEvent::ServerLog { stream, line } => Some(format!("[{stream}] {line}")),
        OrchestratorEvent::ServerReady {
            model_name,
            pid,
            port,
        } => Some(format!(
            "[server] {model_name} ready on http://localhost:{port} (pid {pid})"
        )),
        OrchestratorEvent::ServerStopped { exit_code } => Some(format!(
            "[server] stopped{}",
            exit_code.map(|c| format!(" (exit code {c})")).unwrap_or_default()
        )),
        OrchestratorEvent::ServerCrashed { exit_code } => Some(format!(
            "[server] crashed{}",
            exit_code.map(|c| format!(" (exit code {c})")).unwrap_or_default()
        )),
        OrchestratorEvent::JobError { message, .. } => Some(format!("error: {message}")),
        OrchestratorEvent::JobDone { outcome } => Some(match outcome.status {
            JobStatus::Succeeded => format!("{} job finished", outcome.kind),
            JobStatus::Cancelled => format!("{} job cancelled", outcome.kind),
            JobStatus::Failed => format!(
                "{} job failed: {}",
                outcome.kind,
                outcome.message.as_deref().unwrap_or("unknown error")
            ),
        }),
        OrchestratorEvent::ToolchainLog { line } => Some(line.clone()),
        OrchestratorEvent::JobStarted { .. }
        | OrchestratorEvent::JobProgress { .. }
        | OrchestratorEvent::JobPercent { .. } => None,
    }
}

/// Progress bar for a job driven by percent events.
pub fn job_progress_bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} {prefix} [{bar:30.cyan/blue}] {pos:>3}% {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_prefix(label.to_string());
    pb
}

#[cfg(test)]
mod tests {
    use wrangler_core::{JobId, JobKind, JobOutcome, ServerState};

    use super::*;

    #[test]
    fn failed_job_shows_message() {
        let outcome = JobOutcome::failed(JobId::new(), JobKind::Quantize, "Quantization failed: x", Some(1));
        assert_eq!(
            describe_event(&OrchestratorEvent::JobDone { outcome }).as_deref(),
            Some("quantize job failed: Quantization failed: x")
        );
    }

    #[test]
    fn progress_lines_are_left_to_the_bar() {
        let event = OrchestratorEvent::job_progress(JobId::new(), "10%");
        assert!(describe_event(&event).is_none());
        assert_eq!(
            describe_event(&OrchestratorEvent::server_state(ServerState::Stopped)).as_deref(),
            Some("[server] stopped")
        );
    }
}
