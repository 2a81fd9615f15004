//! Download jobs driven by Python helper scripts.

use std::path::{Path, PathBuf};

use wrangler_core::{ConfigurationError, JobKind, OrchestratorError, Settings};

use super::{Completion, JobRequest, classify};
use crate::process::LaunchSpec;

const HF_PREFIX: &str = "https://huggingface.co/";
const INTERPRETER: &str = "python3";

/// Where a model is downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadSource {
    /// HuggingFace repository id, e.g. `TheBloke/Mistral-7B-GGUF`.
    HuggingFace { repo_id: String },
    /// Ollama registry name, e.g. `llama3:8b`.
    Ollama { model_name: String },
}

impl DownloadSource {
    /// HuggingFace source from a repository URL or bare repository id.
    pub fn huggingface(url_or_id: &str) -> Self {
        Self::HuggingFace {
            repo_id: normalize_hf_repo(url_or_id),
        }
    }

    pub fn ollama(model_name: impl Into<String>) -> Self {
        Self::Ollama {
            model_name: model_name.into(),
        }
    }

    /// Helper script file name inside the scripts directory.
    pub const fn script_name(&self) -> &'static str {
        match self {
            Self::HuggingFace { .. } => "download_hf.py",
            Self::Ollama { .. } => "download_ollama.py",
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            Self::HuggingFace { repo_id } => repo_id,
            Self::Ollama { model_name } => model_name,
        }
    }

    /// Whether stderr error lines are cleaned before being reported live.
    pub(crate) const fn cleans_error_lines(&self) -> bool {
        matches!(self, Self::HuggingFace { .. })
    }

    pub(crate) fn failure_message(&self, buffer: &str, exit_code: Option<i32>) -> String {
        match self {
            Self::HuggingFace { .. } => classify::huggingface_failure(buffer, exit_code),
            Self::Ollama { model_name } => classify::ollama_failure(model_name, buffer, exit_code),
        }
    }
}

/// Repository id from a HuggingFace URL: query dropped, host prefix removed.
pub fn normalize_hf_repo(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or(url);
    without_query
        .strip_prefix(HF_PREFIX)
        .unwrap_or(without_query)
        .to_string()
}

/// Build a download job running `script` with `interpreter`.
///
/// The script receives `<identifier> <output dir> <quant level>`.
pub fn download_request(
    source: DownloadSource,
    interpreter: &Path,
    script: &Path,
    models_dir: &Path,
    quant_level: &str,
) -> JobRequest {
    let spec = LaunchSpec::new(interpreter)
        .arg(script)
        .arg(source.identifier())
        .arg(models_dir)
        .arg(quant_level);

    JobRequest {
        kind: JobKind::Download,
        target: source.identifier().to_string(),
        output_hint: Some(models_dir.to_path_buf()),
        spec,
        completion: Completion::Download(source),
    }
}

/// Resolve `python3` and the helper script from settings.
pub fn plan_download(source: DownloadSource, settings: &Settings) -> Result<JobRequest, OrchestratorError> {
    let interpreter = which::which(INTERPRETER).map_err(|_| ConfigurationError::InterpreterNotFound {
        name: INTERPRETER.to_string(),
    })?;

    let script: PathBuf = settings.scripts_dir.join(source.script_name());
    if !script.is_file() {
        return Err(ConfigurationError::ScriptNotFound { path: script }.into());
    }

    Ok(download_request(
        source,
        &interpreter,
        &script,
        &settings.models_dir,
        &settings.default_quant_level,
    ))
}
