//! End-to-end scenarios through the `Orchestrator` facade.

#![cfg(unix)]

mod common;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_test::{assert_err, assert_ok};
use wrangler_core::{
    ActionOutcome, ConfigHandle, ConfigurationError, ExternalSupervisor, OrchestratorError,
    ServerState, Settings, SettingsUpdate,
};
use wrangler_runtime::{MemorySettingsStore, Orchestrator};

use common::{
    IDLE_SERVER, RecordingSink, SpyLauncher, fake_toolchain, fast_options, free_port, model_file,
    ready_probe, settings_for,
};

fn orchestrator(settings: Settings) -> (Orchestrator, Arc<SpyLauncher>, Arc<MemorySettingsStore>) {
    let store = Arc::new(MemorySettingsStore::new(settings.clone()));
    let launcher = Arc::new(SpyLauncher::default());
    let orchestrator = Orchestrator::new(
        ConfigHandle::with_settings(store.clone(), settings),
        launcher.clone(),
        ready_probe(),
        Arc::new(RecordingSink::default()),
        fast_options(5),
    );
    (orchestrator, launcher, store)
}

#[tokio::test]
async fn no_toolchain_reports_binary_not_found() {
    let empty = tempfile::tempdir().unwrap();
    let (orchestrator, launcher, _) = orchestrator(settings_for(empty.path(), 7070));

    let result = orchestrator.switch_model(Path::new("/x/model.gguf")).await;
    let err = assert_err!(&result);
    assert!(matches!(
        err,
        OrchestratorError::Configuration(ConfigurationError::BinaryNotFound { .. })
    ));
    assert_eq!(launcher.count(), 0);

    let outcome = Orchestrator::outcome(result);
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("llama-server executable not found"));
}

#[tokio::test]
async fn served_model_cannot_be_deleted() {
    let toolchain = fake_toolchain(IDLE_SERVER, "exit 0");
    let served = model_file(toolchain.path(), "served.gguf");
    let idle = model_file(toolchain.path(), "idle.gguf");
    let (orchestrator, _, _) = orchestrator(settings_for(toolchain.path(), free_port()));

    assert_ok!(orchestrator.switch_model(&served).await);
    let current = orchestrator.current_model().await;
    assert_eq!(current.as_ref().and_then(ServerState::model_name), Some("served.gguf"));

    let err = assert_err!(orchestrator.delete_model(&served));
    assert!(matches!(err, OrchestratorError::ModelInUse(_)));
    assert!(served.exists());

    assert_ok!(orchestrator.delete_model(&idle));
    assert!(!idle.exists());
    assert!(matches!(
        orchestrator.delete_model(&idle),
        Err(OrchestratorError::ModelNotFound(_))
    ));

    orchestrator.shutdown().await;
    assert_eq!(orchestrator.supervisor().state(), ServerState::Stopped);
}

#[tokio::test]
async fn models_are_listed_from_the_managed_directory() {
    let toolchain = fake_toolchain(IDLE_SERVER, "exit 0");
    let settings = settings_for(toolchain.path(), 7070);
    std::fs::create_dir_all(&settings.models_dir).unwrap();
    model_file(&settings.models_dir, "b-Q4_0.gguf");
    model_file(&settings.models_dir, "a-Q8_0.gguf");
    model_file(&settings.models_dir, "ggml-vocab-llama.gguf");
    let (orchestrator, _, _) = orchestrator(settings);

    let names: Vec<String> = orchestrator
        .list_models()
        .into_iter()
        .map(|m| m.filename)
        .collect();
    assert_eq!(names, ["a-Q8_0.gguf", "b-Q4_0.gguf"]);
}

#[tokio::test]
async fn toolchain_root_must_contain_a_server() {
    let empty = tempfile::tempdir().unwrap();
    let built = fake_toolchain(IDLE_SERVER, "exit 0");
    let (orchestrator, _, _) = orchestrator(settings_for(empty.path(), 7070));

    let err = assert_err!(orchestrator.set_toolchain_root(empty.path()).await);
    assert!(err.is_configuration());

    let settings = assert_ok!(orchestrator.set_toolchain_root(built.path()).await);
    assert_eq!(settings.toolchain_root, built.path());
    assert_eq!(orchestrator.settings().toolchain_root, built.path());
    assert!(orchestrator.check_dependencies().toolchain_installed());
}

#[tokio::test]
async fn invalid_settings_update_is_rejected() {
    let empty = tempfile::tempdir().unwrap();
    let (orchestrator, _, _) = orchestrator(settings_for(empty.path(), 7070));

    let update = SettingsUpdate {
        server_port: Some(80),
        ..SettingsUpdate::default()
    };
    let outcome: ActionOutcome = Orchestrator::outcome(orchestrator.update_settings(&update).await);
    assert!(!outcome.success);
    assert_eq!(orchestrator.settings().server_port, 7070);

    let update = SettingsUpdate {
        default_quant_level: Some("Q5_K_M".to_string()),
        ..SettingsUpdate::default()
    };
    assert_ok!(orchestrator.update_settings(&update).await);
    assert_eq!(orchestrator.settings().default_quant_level, "Q5_K_M");
}

#[tokio::test]
async fn quantize_defaults_to_configured_level() {
    let toolchain = fake_toolchain("exit 0", "cp \"$1\" \"$2\"");
    let mut settings = settings_for(toolchain.path(), 7070);
    settings.default_quant_level = "Q5_K_S".to_string();
    let input = model_file(toolchain.path(), "base.gguf");
    let (orchestrator, _, _) = orchestrator(settings);

    let ticket = assert_ok!(orchestrator.start_quantize(&input, None));
    assert_eq!(orchestrator.list_jobs().len(), 1);
    assert!(ticket.outcome().await.unwrap().is_success());
    assert!(toolchain.path().join("base-Q5_K_S.gguf").exists());
    assert!(orchestrator.list_jobs().is_empty());
}

/// Service manager that accepts switches but never binds the port.
struct SilentService;

#[async_trait]
impl ExternalSupervisor for SilentService {
    fn is_active(&self) -> bool {
        true
    }

    async fn switch_model(&self, model_path: &Path) -> Result<String, OrchestratorError> {
        Ok(model_path.file_name().unwrap().to_string_lossy().into_owned())
    }
}

#[tokio::test]
async fn delegated_model_is_looked_up_not_remembered() {
    let empty = tempfile::tempdir().unwrap();
    let (orchestrator, launcher, _) = orchestrator(settings_for(empty.path(), free_port()));
    let orchestrator = orchestrator.with_external(Arc::new(SilentService));

    let state = assert_ok!(orchestrator.switch_model(Path::new("/models/phi-Q4_0.gguf")).await);
    assert_eq!(state.model_name(), Some("phi-Q4_0.gguf"));
    assert_eq!(launcher.count(), 0);

    assert_eq!(orchestrator.supervisor().state(), ServerState::Stopped);
    assert_eq!(orchestrator.current_model().await, None);
}
