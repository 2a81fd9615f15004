//! Core domain types and port definitions for wrangler.
//!
//! This crate holds everything the orchestrator reasons about without touching
//! the operating system: model and job types, the server state machine's
//! states, settings and their validation, the error taxonomy surfaced to
//! hosts, the event union pushed to sinks, and the port traits that runtime
//! adapters implement.
//!
//! Process spawning, HTTP probing and filesystem scanning live in
//! `wrangler-runtime`.

pub mod domain;
pub mod error;
pub mod events;
pub mod paths;
pub mod ports;
pub mod services;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    JobId, JobKind, JobOutcome, JobStatus, JobSummary, ModelFile, ModelLocation, ServerState,
    ToolRole, UNKNOWN_QUANT_TAG, is_model_artifact, quant_tag_from_filename,
    quantized_output_path, strip_quant_suffix,
};
pub use error::{ActionOutcome, ConfigurationError, OrchestratorError};
pub use events::{OrchestratorEvent, OutputStream};
pub use ports::{
    EventSink, ExternalSupervisor, HttpProbe, NoopSink, ProbeError, SettingsStore, StoreError,
};
pub use services::ConfigHandle;
pub use settings::{
    DEFAULT_CONTEXT_SIZE, DEFAULT_QUANT_LEVEL, DEFAULT_SERVER_PORT, Settings, SettingsError,
    SettingsUpdate, validate_settings,
};

// Re-export path utilities
pub use paths::{
    PathError, data_root, default_alt_root, default_models_dir, default_scripts_dir,
    default_toolchain_root, settings_file_path, wrangler_home,
};
