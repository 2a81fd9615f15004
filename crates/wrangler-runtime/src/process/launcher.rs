//! Spawn seam used by the supervisor and the job registry.

use super::{LaunchSpec, ProcessError, ProcessHandle};

/// Starts processes.
///
/// Production code uses [`TokioLauncher`]. Tests wrap it to count or refuse
/// spawns.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, spec: &LaunchSpec) -> Result<ProcessHandle, ProcessError>;
}

/// Spawns real child processes on the current tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioLauncher;

impl ProcessLauncher for TokioLauncher {
    fn launch(&self, spec: &LaunchSpec) -> Result<ProcessHandle, ProcessError> {
        ProcessHandle::spawn(spec)
    }
}
