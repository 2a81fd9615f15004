//! Background job registry: downloads and quantizations.
//!
//! Each job wraps one external process. Jobs run concurrently with no
//! admission control. A per-job monitor task forwards output to the event
//! sink, classifies failures and reports the terminal outcome exactly once.
//!
//! # Lifecycle
//!
//! - `start_*` spawns the process, registers it and emits `JobStarted`
//! - the monitor drains output until the process exits
//! - on exit the job is removed, `JobDone` is emitted and the ticket resolves
//!
//! A job terminated through [`JobRegistry::cancel_job`] ends as `Cancelled`,
//! never as `Failed`.

mod classify;
mod download;
mod quantize;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use futures_util::future::join_all;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use wrangler_core::{
    EventSink, JobId, JobKind, JobOutcome, JobSummary, OrchestratorError, OrchestratorEvent,
    OutputStream, Settings,
};

pub use classify::{
    clean_error_line, huggingface_failure, is_error_line, ollama_failure, parse_percent,
    quantize_failure,
};
pub use download::{DownloadSource, download_request, normalize_hf_repo, plan_download};
pub use quantize::{QuantizePlan, plan_quantize};

use crate::process::{ExitInfo, ExitWatcher, LaunchSpec, OutputLine, OutputLines, ProcessHandle, ProcessLauncher};

/// Output still arriving after exit is collected for at most this long.
const OUTPUT_DRAIN: Duration = Duration::from_millis(250);

/// Upper bound on buffered output kept for failure classification.
const FAILURE_BUFFER_LIMIT: usize = 64 * 1024;

/// Post-exit handling of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    Download(DownloadSource),
    Quantize(QuantizePlan),
}

/// Fully resolved job, ready to spawn.
#[derive(Debug, Clone)]
pub struct JobRequest {
    pub kind: JobKind,
    /// What the job works on, shown in listings.
    pub target: String,
    pub output_hint: Option<PathBuf>,
    pub spec: LaunchSpec,
    pub completion: Completion,
}

/// Receipt for a started job.
#[derive(Debug)]
pub struct JobTicket {
    pub id: JobId,
    outcome: oneshot::Receiver<JobOutcome>,
}

impl JobTicket {
    /// Wait for the terminal outcome.
    ///
    /// Returns `None` only if the runtime shut down before the job finished.
    pub async fn outcome(self) -> Option<JobOutcome> {
        self.outcome.await.ok()
    }
}

struct JobEntry {
    summary: JobSummary,
    handle: ProcessHandle,
}

type JobTable = Arc<Mutex<HashMap<JobId, JobEntry>>>;

fn lock(jobs: &JobTable) -> MutexGuard<'_, HashMap<JobId, JobEntry>> {
    jobs.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of running background jobs.
pub struct JobRegistry {
    launcher: Arc<dyn ProcessLauncher>,
    sink: Arc<dyn EventSink>,
    jobs: JobTable,
}

impl JobRegistry {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            launcher,
            sink,
            jobs: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Spawn `request` and start monitoring it.
    pub fn start_job(&self, request: JobRequest) -> Result<JobTicket, OrchestratorError> {
        let mut handle = self.launcher.launch(&request.spec)?;
        let id = JobId::new();
        let pid = handle.pid();
        let output = handle.take_output();
        let exit = handle.exit_watcher();

        let summary = JobSummary {
            id,
            kind: request.kind,
            target: request.target.clone(),
            output_path_hint: request.output_hint.clone(),
            pid,
            started_at: Utc::now(),
        };
        lock(&self.jobs).insert(id, JobEntry { summary, handle });

        info!(job_id = %id, kind = %request.kind, pid = %pid, target = %request.target, "started job");
        self.sink.emit(OrchestratorEvent::JobStarted {
            id,
            kind: request.kind,
            target: request.target,
        });

        let (tx, rx) = oneshot::channel();
        let monitor = JobMonitor {
            id,
            kind: request.kind,
            sink: Arc::clone(&self.sink),
            jobs: Arc::clone(&self.jobs),
        };
        tokio::spawn(monitor.run(request.completion, output, exit, tx));

        Ok(JobTicket { id, outcome: rx })
    }

    /// Start quantizing `input` to `quant_level`.
    ///
    /// Fails without spawning when the binary is missing or the output exists.
    pub fn start_quantize(
        &self,
        input: &Path,
        quant_level: &str,
        settings: &Settings,
    ) -> Result<JobTicket, OrchestratorError> {
        let request = plan_quantize(input, quant_level, settings)?;
        self.start_job(request)
    }

    pub fn start_download(
        &self,
        source: DownloadSource,
        settings: &Settings,
    ) -> Result<JobTicket, OrchestratorError> {
        let request = plan_download(source, settings)?;
        self.start_job(request)
    }

    /// Terminate a job and remove it. Its outcome is reported as `Cancelled`.
    pub async fn cancel_job(&self, id: JobId) -> Result<(), OrchestratorError> {
        let entry = lock(&self.jobs)
            .remove(&id)
            .ok_or(OrchestratorError::JobNotFound(id))?;

        let info = entry.handle.terminate().await;
        info!(job_id = %id, pid = %entry.summary.pid, exit_code = ?info.code, "cancelled job");
        Ok(())
    }

    /// Terminate every running job.
    pub async fn cancel_all(&self) {
        let entries: Vec<JobEntry> = lock(&self.jobs).drain().map(|(_, entry)| entry).collect();
        if entries.is_empty() {
            return;
        }

        info!(count = entries.len(), "cancelling all jobs");
        join_all(entries.iter().map(|entry| entry.handle.terminate())).await;
    }

    /// Running jobs, oldest first.
    pub fn list(&self) -> Vec<JobSummary> {
        let mut jobs: Vec<_> = lock(&self.jobs)
            .values()
            .map(|entry| entry.summary.clone())
            .collect();
        jobs.sort_by_key(|job| job.started_at);
        jobs
    }

    pub fn is_running(&self, id: JobId) -> bool {
        lock(&self.jobs).contains_key(&id)
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("running", &lock(&self.jobs).len())
            .finish_non_exhaustive()
    }
}

struct JobMonitor {
    id: JobId,
    kind: JobKind,
    sink: Arc<dyn EventSink>,
    jobs: JobTable,
}

impl JobMonitor {
    async fn run(
        self,
        completion: Completion,
        mut output: Option<OutputLines>,
        mut exit: ExitWatcher,
        tx: oneshot::Sender<JobOutcome>,
    ) {
        let mut observer = OutputObserver::new(self.id, &completion, Arc::clone(&self.sink));

        let info = loop {
            tokio::select! {
                biased;
                line = next_line(&mut output) => match line {
                    Some(line) => observer.observe(line),
                    None => break exit.wait().await,
                },
                info = exit.wait() => break info,
            }
        };

        // Pipes may still hold lines written just before exit.
        let _ = timeout(OUTPUT_DRAIN, async {
            while let Some(line) = next_line(&mut output).await {
                observer.observe(line);
            }
        })
        .await;

        let outcome = self.outcome(&completion, &observer, info).await;
        lock(&self.jobs).remove(&self.id);

        match &outcome.message {
            Some(message) => warn!(job_id = %self.id, kind = %self.kind, exit_code = ?outcome.exit_code, message = %message, "job failed"),
            None => info!(job_id = %self.id, kind = %self.kind, status = ?outcome.status, "job finished"),
        }
        self.sink.emit(OrchestratorEvent::JobDone {
            outcome: outcome.clone(),
        });
        let _ = tx.send(outcome);
    }

    async fn outcome(&self, completion: &Completion, observer: &OutputObserver, info: ExitInfo) -> JobOutcome {
        if info.requested {
            return JobOutcome::cancelled(self.id, self.kind, info.code);
        }

        if info.code != Some(0) {
            let message = match completion {
                Completion::Download(source) => source.failure_message(&observer.failure, info.code),
                Completion::Quantize(_) => quantize_failure(&observer.failure, &observer.stdout),
            };
            return JobOutcome::failed(self.id, self.kind, message, info.code);
        }

        match completion {
            Completion::Download(_) => JobOutcome::succeeded(self.id, self.kind),
            Completion::Quantize(plan) => self.finish_quantize(plan).await,
        }
    }

    async fn finish_quantize(&self, plan: &QuantizePlan) -> JobOutcome {
        if !tokio::fs::try_exists(&plan.output).await.unwrap_or(false) {
            return JobOutcome::failed(
                self.id,
                self.kind,
                "Quantization completed but output file not found",
                Some(0),
            );
        }

        if plan.delete_original {
            match tokio::fs::remove_file(&plan.input).await {
                Ok(()) => info!(job_id = %self.id, path = %plan.input.display(), "deleted original model"),
                // The quantized output exists, so the job still succeeded.
                Err(e) => warn!(job_id = %self.id, path = %plan.input.display(), error = %e, "failed to delete original model"),
            }
        }
        JobOutcome::succeeded(self.id, self.kind)
    }
}

async fn next_line(output: &mut Option<OutputLines>) -> Option<OutputLine> {
    match output {
        Some(lines) => lines.next_line().await,
        None => None,
    }
}

/// How live stderr lines are surfaced.
#[derive(Debug, Clone, Copy)]
enum ErrorLines {
    /// Only marked lines, with their prefix stripped.
    Cleaned,
    /// Every non-blank line as-is.
    Raw,
    /// Buffered for the failure message only.
    Silent,
}

/// Classifies job output as it arrives.
struct OutputObserver {
    id: JobId,
    sink: Arc<dyn EventSink>,
    error_lines: ErrorLines,
    /// Lines matched against known causes on failure.
    failure: String,
    stdout: String,
}

impl OutputObserver {
    fn new(id: JobId, completion: &Completion, sink: Arc<dyn EventSink>) -> Self {
        let error_lines = match completion {
            Completion::Download(source) if source.cleans_error_lines() => ErrorLines::Cleaned,
            Completion::Download(_) => ErrorLines::Raw,
            Completion::Quantize(_) => ErrorLines::Silent,
        };
        Self {
            id,
            sink,
            error_lines,
            failure: String::new(),
            stdout: String::new(),
        }
    }

    fn observe(&mut self, output: OutputLine) {
        let OutputLine { stream, line } = output;
        debug!(job_id = %self.id, stream = %stream, line = %line, "job output");

        match stream {
            OutputStream::Stdout => {
                if let Some(percent) = parse_percent(&line) {
                    self.sink.emit(OrchestratorEvent::JobPercent {
                        id: self.id,
                        percent,
                    });
                }
                if matches!(self.error_lines, ErrorLines::Silent) {
                    push_bounded(&mut self.stdout, &line);
                } else if line.contains("Error:") {
                    push_bounded(&mut self.failure, &line);
                }
                self.sink.emit(OrchestratorEvent::job_progress(self.id, line));
            }
            OutputStream::Stderr => {
                push_bounded(&mut self.failure, &line);
                match self.error_lines {
                    ErrorLines::Cleaned if is_error_line(&line) => {
                        if let Some(message) = clean_error_line(&line) {
                            self.sink.emit(OrchestratorEvent::job_error(self.id, message));
                        }
                    }
                    ErrorLines::Raw if !line.trim().is_empty() => {
                        self.sink.emit(OrchestratorEvent::job_error(self.id, line));
                    }
                    _ => {}
                }
            }
        }
    }
}

fn push_bounded(buffer: &mut String, line: &str) {
    if buffer.len() + line.len() < FAILURE_BUFFER_LIMIT {
        buffer.push_str(line);
        buffer.push('\n');
    }
}
