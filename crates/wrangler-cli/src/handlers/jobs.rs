//! `wrangler download` and `wrangler quantize`: start a job and follow it.

use std::path::Path;

use anyhow::{Result, bail};
use indicatif::ProgressBar;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;
use wrangler_core::{JobOutcome, JobStatus, OrchestratorEvent};
use wrangler_runtime::{DownloadSource, JobTicket};

use super::print_json;
use crate::CliContext;
use crate::commands::DownloadCommand;
use crate::presentation::{describe_event, job_progress_bar};

pub async fn download(ctx: &CliContext, command: DownloadCommand) -> Result<()> {
    let source = match command {
        DownloadCommand::Hf { url } => DownloadSource::huggingface(&url),
        DownloadCommand::Ollama { name } => DownloadSource::ollama(name),
    };
    let label = source.identifier().to_string();

    let events = ctx.events.subscribe();
    let ticket = ctx.orchestrator.start_download(source)?;
    let outcome = follow(ctx, events, ticket, &label).await?;
    report(ctx, &outcome)
}

pub async fn quantize(ctx: &CliContext, model: &Path, level: Option<&str>) -> Result<()> {
    let label = model
        .file_name()
        .map_or_else(|| model.display().to_string(), |n| n.to_string_lossy().into_owned());

    let events = ctx.events.subscribe();
    let ticket = ctx.orchestrator.start_quantize(model, level)?;
    let outcome = follow(ctx, events, ticket, &label).await?;
    report(ctx, &outcome)
}

/// Render a job's events until it finishes. Ctrl-C cancels the job.
async fn follow(
    ctx: &CliContext,
    mut events: broadcast::Receiver<OrchestratorEvent>,
    ticket: JobTicket,
    label: &str,
) -> Result<JobOutcome> {
    let id = ticket.id;
    let pb = if ctx.json {
        ProgressBar::hidden()
    } else {
        job_progress_bar(label)
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut cancelling = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) if event.job_id() == Some(id) => {
                    match &event {
                        OrchestratorEvent::JobPercent { percent, .. } => pb.set_position(u64::from(*percent)),
                        OrchestratorEvent::JobProgress { line, .. } => pb.set_message(line.clone()),
                        OrchestratorEvent::JobDone { .. } => break,
                        _ => {
                            if let Some(text) = describe_event(&event) {
                                pb.println(text);
                            }
                        }
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!(skipped, "event stream lagged");
                    // JobDone may have been among the skipped events.
                    if !ctx.orchestrator.jobs().is_running(id) {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            _ = &mut ctrl_c, if !cancelling => {
                cancelling = true;
                pb.println(format!("Cancelling job {}...", id.short()));
                // The job may have finished in the meantime.
                if let Err(e) = ctx.orchestrator.cancel_job(id).await {
                    debug!(job_id = %id, error = %e, "cancel skipped");
                }
            }
        }
    }
    pb.finish_and_clear();

    match ticket.outcome().await {
        Some(outcome) => Ok(outcome),
        None => bail!("job {id} ended without reporting an outcome"),
    }
}

fn report(ctx: &CliContext, outcome: &JobOutcome) -> Result<()> {
    if ctx.json {
        print_json(outcome)?;
    }
    match outcome.status {
        JobStatus::Succeeded => {
            if !ctx.json {
                println!("✓ {} job finished", outcome.kind);
            }
            Ok(())
        }
        JobStatus::Cancelled => {
            if !ctx.json {
                println!("{} job cancelled", outcome.kind);
            }
            Ok(())
        }
        JobStatus::Failed => bail!(
            "{}",
            outcome.message.as_deref().unwrap_or("job failed")
        ),
    }
}
