//! Owned child process with graceful-then-forced termination.

use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{debug, warn};
use wrangler_core::{OrchestratorError, OutputStream};

use super::shutdown;
use super::stream::spawn_line_reader;

/// Time a process gets to exit after the graceful stop signal.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("spawned {} but the OS reported no PID", .0.display())]
    NoPid(PathBuf),
}

impl From<ProcessError> for OrchestratorError {
    fn from(err: ProcessError) -> Self {
        match &err {
            ProcessError::Spawn { program, source } => Self::spawn(program.display().to_string(), source),
            ProcessError::NoPid(program) => Self::spawn(program.display().to_string(), "no PID"),
        }
    }
}

/// What to run. Arguments are passed as a vector; no shell is involved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(String, OsString)>,
}

impl LaunchSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program name for logs and error messages.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map_or_else(|| self.program.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}

/// One line of child output, tagged by origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub line: String,
}

/// Merged stdout/stderr lines of one process.
///
/// Finite and not restartable: it ends once both pipes are closed.
#[derive(Debug)]
pub struct OutputLines {
    rx: mpsc::UnboundedReceiver<OutputLine>,
}

impl OutputLines {
    pub async fn next_line(&mut self) -> Option<OutputLine> {
        self.rx.recv().await
    }
}

/// How a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitInfo {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    /// Whether the exit followed a terminate or kill request.
    pub requested: bool,
}

/// Observer of a process exit. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ExitWatcher {
    rx: watch::Receiver<Option<Option<i32>>>,
    stop_requested: Arc<AtomicBool>,
}

impl ExitWatcher {
    /// Suspend until the process has exited.
    pub async fn wait(&mut self) -> ExitInfo {
        let code = match self.rx.wait_for(Option::is_some).await {
            Ok(status) => (*status).flatten(),
            // Monitor task gone without reporting; the child was dropped with it.
            Err(_) => None,
        };
        ExitInfo {
            code,
            requested: self.stop_requested.load(Ordering::SeqCst),
        }
    }

    pub fn has_exited(&self) -> bool {
        self.rx.borrow().is_some()
    }
}

/// A running (or finished) child process.
///
/// The `tokio::process::Child` lives in a monitor task that reaps it and
/// publishes the exit. Dropping the handle force-kills the process.
#[derive(Debug)]
pub struct ProcessHandle {
    pid: u32,
    program: String,
    output: Option<OutputLines>,
    exit: ExitWatcher,
    kill_tx: mpsc::Sender<()>,
}

impl ProcessHandle {
    /// Spawn `spec` with piped output.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(spec: &LaunchSpec) -> Result<Self, ProcessError> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_os_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            program: spec.program.clone(),
            source,
        })?;
        let pid = child
            .id()
            .ok_or_else(|| ProcessError::NoPid(spec.program.clone()))?;
        let program = spec.program_name();

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        if let Some(stdout) = child.stdout.take() {
            spawn_line_reader(stdout, pid, OutputStream::Stdout, line_tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_line_reader(stderr, pid, OutputStream::Stderr, line_tx);
        }

        let (exit_tx, exit_rx) = watch::channel(None);
        let (kill_tx, mut kill_rx) = mpsc::channel::<()>(1);
        let monitored = program.clone();

        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                // Kill request, or every handle dropped.
                _ = kill_rx.recv() => {
                    if let Err(e) = child.start_kill() {
                        debug!(pid = %pid, error = %e, "forced kill failed, process likely gone");
                    }
                    child.wait().await
                }
            };

            let code = match status {
                Ok(status) => status.code(),
                Err(e) => {
                    warn!(pid = %pid, program = %monitored, error = %e, "failed to reap process");
                    None
                }
            };
            debug!(pid = %pid, program = %monitored, exit_code = ?code, "process exited");
            let _ = exit_tx.send(Some(code));
        });

        debug!(pid = %pid, program = %program, "spawned process");

        Ok(Self {
            pid,
            program,
            output: Some(OutputLines { rx: line_rx }),
            exit: ExitWatcher {
                rx: exit_rx,
                stop_requested: Arc::new(AtomicBool::new(false)),
            },
            kill_tx,
        })
    }

    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Take the output line stream. Returns `None` after the first call.
    pub fn take_output(&mut self) -> Option<OutputLines> {
        self.output.take()
    }

    pub fn exit_watcher(&self) -> ExitWatcher {
        self.exit.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.exit.has_exited()
    }

    /// Suspend until the process exits and return its exit code.
    pub async fn exit_code(&self) -> Option<i32> {
        self.exit.clone().wait().await.code
    }

    /// Force-kill without a grace period.
    pub fn kill(&self) {
        self.exit.stop_requested.store(true, Ordering::SeqCst);
        let _ = self.kill_tx.try_send(());
    }

    /// Stop the process: graceful signal, [`TERMINATE_GRACE`], then forced kill.
    ///
    /// Returns once the process has been reaped.
    pub async fn terminate(&self) -> ExitInfo {
        self.exit.stop_requested.store(true, Ordering::SeqCst);
        let mut exit = self.exit.clone();
        if exit.has_exited() {
            return exit.wait().await;
        }

        match shutdown::request_stop(self.pid) {
            Ok(()) => {
                if let Ok(info) = timeout(TERMINATE_GRACE, exit.wait()).await {
                    return info;
                }
                debug!(pid = %self.pid, program = %self.program, "grace period elapsed, forcing kill");
            }
            Err(e) => {
                debug!(pid = %self.pid, error = %e, "graceful stop unavailable, forcing kill");
            }
        }

        self.kill();
        exit.wait().await
    }
}
