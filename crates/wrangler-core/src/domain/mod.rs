//! Domain types shared by every layer of the orchestrator.

mod job;
mod model;
mod server;
mod toolchain;

pub use job::{JobId, JobKind, JobOutcome, JobStatus, JobSummary};
pub use model::{
    MODEL_EXTENSION, ModelFile, ModelLocation, UNKNOWN_QUANT_TAG, VOCAB_ONLY_MARKER,
    is_model_artifact, quant_tag_from_filename, quantized_output_path, strip_quant_suffix,
};
pub use server::ServerState;
pub use toolchain::ToolRole;
