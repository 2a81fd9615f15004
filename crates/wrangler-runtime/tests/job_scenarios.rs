//! Job registry scenarios with fake download scripts and quantize binaries.

#![cfg(unix)]

mod common;

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_test::{assert_err, assert_ok};
use wrangler_core::{JobStatus, OrchestratorError, OrchestratorEvent};
use wrangler_runtime::jobs::{DownloadSource, download_request};
use wrangler_runtime::JobRegistry;

use common::{RecordingSink, SpyLauncher, fake_toolchain, model_file, settings_for, write_script};

fn registry() -> (JobRegistry, Arc<SpyLauncher>, Arc<RecordingSink>) {
    let launcher = Arc::new(SpyLauncher::default());
    let sink = Arc::new(RecordingSink::default());
    (JobRegistry::new(launcher.clone(), sink.clone()), launcher, sink)
}

/// Download job running `body` through `/bin/sh`.
fn download_job(dir: &Path, source: DownloadSource, body: &str) -> wrangler_runtime::JobRequest {
    let script = dir.join(source.script_name());
    write_script(&script, body);
    download_request(source, Path::new("/bin/sh"), &script, dir, "Q4_K_M")
}

#[tokio::test]
async fn existing_quantize_output_is_rejected_without_spawning() {
    let toolchain = fake_toolchain("exit 0", "exit 0");
    let input = model_file(toolchain.path(), "mistral-Q8_0.gguf");
    model_file(toolchain.path(), "mistral-Q4_K_M.gguf");
    let (registry, launcher, _) = registry();

    let err = assert_err!(registry.start_quantize(
        &input,
        "Q4_K_M",
        &settings_for(toolchain.path(), 7070)
    ));
    assert!(matches!(err, OrchestratorError::OutputAlreadyExists { .. }));
    assert_eq!(launcher.count(), 0);
    assert!(registry.list().is_empty());
}

#[tokio::test]
async fn successful_quantize_can_delete_the_original() {
    let toolchain = fake_toolchain("exit 0", "echo 'quantizing 50%'\ncp \"$1\" \"$2\"");
    let input = model_file(toolchain.path(), "llama.gguf");
    let mut settings = settings_for(toolchain.path(), 7070);
    settings.delete_original_after_quantize = true;
    let (registry, _, sink) = registry();

    let ticket = assert_ok!(registry.start_quantize(&input, "Q8_0", &settings));
    let id = ticket.id;
    let outcome = ticket.outcome().await.unwrap();

    assert_eq!(outcome.status, JobStatus::Succeeded);
    assert!(toolchain.path().join("llama-Q8_0.gguf").exists());
    assert!(!input.exists());
    assert_eq!(
        sink.count(|e| *e == OrchestratorEvent::JobPercent { id, percent: 50 }),
        1
    );
    assert!(registry.list().is_empty());
}

#[tokio::test]
async fn quantize_without_output_file_fails() {
    let toolchain = fake_toolchain("exit 0", "exit 0");
    let input = model_file(toolchain.path(), "tiny.gguf");
    let (registry, _, _) = registry();

    let ticket = assert_ok!(registry.start_quantize(&input, "Q4_0", &settings_for(toolchain.path(), 7070)));
    let outcome = ticket.outcome().await.unwrap();

    assert_eq!(outcome.status, JobStatus::Failed);
    assert!(outcome.message.unwrap().contains("output file not found"));
    assert!(input.exists());
}

#[tokio::test]
async fn quantize_failure_reports_stderr() {
    let toolchain = fake_toolchain("exit 0", "echo 'invalid magic' >&2\nexit 1");
    let input = model_file(toolchain.path(), "bad.gguf");
    let (registry, _, _) = registry();

    let ticket = assert_ok!(registry.start_quantize(&input, "Q4_0", &settings_for(toolchain.path(), 7070)));
    let outcome = ticket.outcome().await.unwrap();

    assert_eq!(outcome.status, JobStatus::Failed);
    assert_eq!(outcome.message.as_deref(), Some("Quantization failed: invalid magic"));
    assert_eq!(outcome.exit_code, Some(1));
}

#[tokio::test]
async fn known_download_cause_replaces_raw_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, _, sink) = registry();
    let request = download_job(
        dir.path(),
        DownloadSource::huggingface("org/model"),
        "echo 'Error: llama.cpp not found' >&2\nexit 1",
    );

    let ticket = assert_ok!(registry.start_job(request));
    let id = ticket.id;
    let outcome = ticket.outcome().await.unwrap();

    assert_eq!(outcome.status, JobStatus::Failed);
    assert_eq!(
        outcome.message.as_deref(),
        Some("llama.cpp installation not found. Please ensure llama.cpp is installed at the configured path.")
    );
    assert_eq!(
        sink.count(|e| *e == OrchestratorEvent::job_error(id, "llama.cpp not found")),
        1
    );
}

#[tokio::test]
async fn download_progress_is_forwarded() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, launcher, sink) = registry();
    let request = download_job(
        dir.path(),
        DownloadSource::ollama("llama3:8b"),
        "echo 'pulling 10%'\necho 'pulling 100%'\necho done",
    );

    let ticket = assert_ok!(registry.start_job(request));
    let id = ticket.id;
    let outcome = ticket.outcome().await.unwrap();

    assert!(outcome.is_success());
    let args: Vec<String> = launcher
        .spec(0)
        .args
        .iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let expected = [
        "llama3:8b".to_string(),
        dir.path().display().to_string(),
        "Q4_K_M".to_string(),
    ];
    assert_eq!(args[1..], expected);

    let progress: Vec<String> = sink
        .events()
        .into_iter()
        .filter_map(|e| match e {
            OrchestratorEvent::JobProgress { id: job, line } if job == id => Some(line),
            _ => None,
        })
        .collect();
    assert_eq!(progress, ["pulling 10%", "pulling 100%", "done"]);
    assert_eq!(
        sink.count(|e| matches!(e, OrchestratorEvent::JobPercent { id: job, .. } if *job == id)),
        2
    );
}

#[tokio::test]
async fn silent_download_failure_reports_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, _, _) = registry();
    let request = download_job(dir.path(), DownloadSource::huggingface("a/b"), "exit 7");

    let outcome = assert_ok!(registry.start_job(request)).outcome().await.unwrap();
    assert_eq!(outcome.message.as_deref(), Some("Download failed (exit code 7)"));
    assert_eq!(outcome.exit_code, Some(7));
}

#[tokio::test]
async fn cancelled_job_is_removed_and_not_failed() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, _, sink) = registry();
    let request = download_job(dir.path(), DownloadSource::huggingface("a/b"), "exec sleep 30");

    let ticket = assert_ok!(registry.start_job(request));
    let id = ticket.id;
    assert_eq!(registry.list().len(), 1);
    assert!(registry.is_running(id));

    assert_ok!(registry.cancel_job(id).await);
    assert!(!registry.is_running(id));

    let outcome = tokio::time::timeout(Duration::from_secs(5), ticket.outcome())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.status, JobStatus::Cancelled);
    assert!(outcome.message.is_none());
    assert_eq!(
        sink.count(|e| matches!(e, OrchestratorEvent::JobDone { outcome } if outcome.id == id)),
        1
    );

    let err = assert_err!(registry.cancel_job(id).await);
    assert!(matches!(err, OrchestratorError::JobNotFound(missing) if missing == id));
}

#[tokio::test]
async fn stubborn_job_is_force_killed_after_grace() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, _, _) = registry();
    let request = download_job(
        dir.path(),
        DownloadSource::huggingface("a/b"),
        "trap '' TERM\nwhile :; do sleep 0.1; done",
    );

    let ticket = assert_ok!(registry.start_job(request));
    // Let the shell install its trap.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    assert_ok!(registry.cancel_job(ticket.id).await);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(900), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(4), "returned after {elapsed:?}");

    let outcome = ticket.outcome().await.unwrap();
    assert_eq!(outcome.status, JobStatus::Cancelled);
}

#[tokio::test]
async fn cancel_all_stops_every_job() {
    let dir = tempfile::tempdir().unwrap();
    let (registry, _, _) = registry();
    let first = assert_ok!(registry.start_job(download_job(
        dir.path(),
        DownloadSource::huggingface("a/b"),
        "exec sleep 30"
    )));
    let second = assert_ok!(registry.start_job(download_job(
        dir.path(),
        DownloadSource::ollama("m"),
        "exec sleep 30"
    )));
    assert_eq!(registry.list().len(), 2);

    registry.cancel_all().await;
    assert!(registry.list().is_empty());
    assert_eq!(first.outcome().await.unwrap().status, JobStatus::Cancelled);
    assert_eq!(second.outcome().await.unwrap().status, JobStatus::Cancelled);
}
