//! Quantize jobs running `llama-quantize`.

use std::path::{Path, PathBuf};

use wrangler_core::{
    ConfigurationError, JobKind, OrchestratorError, Settings, ToolRole, quantized_output_path,
};

use super::{Completion, JobRequest};
use crate::locator;
use crate::process::LaunchSpec;

/// Dynamic loader search path variable for the current platform.
const LIBRARY_PATH_VAR: Option<&str> = if cfg!(target_os = "macos") {
    Some("DYLD_LIBRARY_PATH")
} else if cfg!(target_os = "linux") {
    Some("LD_LIBRARY_PATH")
} else {
    None
};

/// What to do once the quantize binary exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizePlan {
    pub input: PathBuf,
    pub output: PathBuf,
    pub quant_level: String,
    /// Remove `input` after `output` is confirmed on disk.
    pub delete_original: bool,
}

/// Locate the binary, derive the output path and refuse existing outputs.
///
/// Nothing is spawned here; an existing output is rejected before any
/// process is created.
pub fn plan_quantize(
    input: &Path,
    quant_level: &str,
    settings: &Settings,
) -> Result<JobRequest, OrchestratorError> {
    let binary = locator::locate(
        ToolRole::Quantize,
        &[&settings.toolchain_root, &settings.alt_root],
    )
    .map_err(ConfigurationError::from)?;

    if !input.is_file() {
        return Err(OrchestratorError::ModelNotFound(input.to_path_buf()));
    }

    let output = quantized_output_path(input, quant_level);
    if output.exists() {
        return Err(OrchestratorError::OutputAlreadyExists {
            path: output,
            quant_level: quant_level.to_string(),
        });
    }

    let mut spec = LaunchSpec::new(&binary)
        .arg(input)
        .arg(&output)
        .arg(quant_level);
    // Shared libraries sit one level above the binary's directory.
    if let (Some(var), Some(lib_dir)) = (LIBRARY_PATH_VAR, binary.parent().and_then(Path::parent)) {
        spec = spec.env(var, lib_dir);
    }

    Ok(JobRequest {
        kind: JobKind::Quantize,
        target: input.display().to_string(),
        output_hint: Some(output.clone()),
        spec,
        completion: Completion::Quantize(QuantizePlan {
            input: input.to_path_buf(),
            output,
            quant_level: quant_level.to_string(),
            delete_original: settings.delete_original_after_quantize,
        }),
    })
}
