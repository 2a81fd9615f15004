//! Settings domain types and validation.
//!
//! Pure domain types with no infrastructure dependencies. Persistence goes
//! through the [`SettingsStore`](crate::ports::SettingsStore) port.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::paths;

/// Default port of the inference server.
pub const DEFAULT_SERVER_PORT: u16 = 7070;

/// Default quantization level for downloads and re-encoding.
pub const DEFAULT_QUANT_LEVEL: &str = "Q4_K_M";

/// Default context window passed to the server (`-c`).
pub const DEFAULT_CONTEXT_SIZE: u32 = 8192;

/// Application settings.
///
/// Missing keys in a stored document fall back to their defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Port the inference server listens on.
    pub server_port: u16,

    /// Primary llama.cpp installation.
    pub toolchain_root: PathBuf,

    /// Alternate llama.cpp installation searched after the primary one.
    pub alt_root: PathBuf,

    /// Directory downloads and quantized models are written to.
    pub models_dir: PathBuf,

    /// Quantization level requested from download helpers.
    pub default_quant_level: String,

    /// Remove the source file once a quantize job produced its output.
    pub delete_original_after_quantize: bool,

    /// Directory holding the download helper scripts.
    pub scripts_dir: PathBuf,

    /// Context window passed to the server.
    pub context_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let home = paths::wrangler_home().unwrap_or_else(|_| PathBuf::from(".llama-wrangler"));
        Self {
            server_port: DEFAULT_SERVER_PORT,
            toolchain_root: paths::default_toolchain_root()
                .unwrap_or_else(|_| home.join("llama.cpp")),
            alt_root: paths::default_alt_root().unwrap_or_else(|_| PathBuf::from(".METALlama.cpp")),
            models_dir: paths::default_models_dir().unwrap_or_else(|_| home.join("models")),
            default_quant_level: DEFAULT_QUANT_LEVEL.to_string(),
            delete_original_after_quantize: false,
            scripts_dir: paths::default_scripts_dir().unwrap_or_else(|_| home.join("scripts")),
            context_size: DEFAULT_CONTEXT_SIZE,
        }
    }
}

impl Settings {
    /// Readiness URL of the inference server on this port.
    pub fn readiness_url(&self) -> String {
        format!("http://localhost:{}/v1/models", self.server_port)
    }

    /// Merge an update into this settings value, only touching fields that are set.
    pub fn merge(&mut self, update: &SettingsUpdate) {
        if let Some(port) = update.server_port {
            self.server_port = port;
        }
        if let Some(ref root) = update.toolchain_root {
            self.toolchain_root.clone_from(root);
        }
        if let Some(ref root) = update.alt_root {
            self.alt_root.clone_from(root);
        }
        if let Some(ref dir) = update.models_dir {
            self.models_dir.clone_from(dir);
        }
        if let Some(ref level) = update.default_quant_level {
            self.default_quant_level.clone_from(level);
        }
        if let Some(delete) = update.delete_original_after_quantize {
            self.delete_original_after_quantize = delete;
        }
        if let Some(ref dir) = update.scripts_dir {
            self.scripts_dir.clone_from(dir);
        }
        if let Some(size) = update.context_size {
            self.context_size = size;
        }
    }
}

/// Partial settings update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    pub server_port: Option<u16>,
    pub toolchain_root: Option<PathBuf>,
    pub alt_root: Option<PathBuf>,
    pub models_dir: Option<PathBuf>,
    pub default_quant_level: Option<String>,
    pub delete_original_after_quantize: Option<bool>,
    pub scripts_dir: Option<PathBuf>,
    pub context_size: Option<u32>,
}

impl SettingsUpdate {
    pub const fn is_empty(&self) -> bool {
        self.server_port.is_none()
            && self.toolchain_root.is_none()
            && self.alt_root.is_none()
            && self.models_dir.is_none()
            && self.default_quant_level.is_none()
            && self.delete_original_after_quantize.is_none()
            && self.scripts_dir.is_none()
            && self.context_size.is_none()
    }
}

/// Settings validation error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SettingsError {
    #[error("Context size must be between 512 and 1,000,000, got {0}")]
    InvalidContextSize(u32),

    #[error("Port should be >= 1024 (privileged ports require root), got {0}")]
    InvalidPort(u16),

    #[error("Quantization level cannot be empty")]
    EmptyQuantLevel,

    #[error("{0} cannot be empty")]
    EmptyPath(&'static str),
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    if !(512..=1_000_000).contains(&settings.context_size) {
        return Err(SettingsError::InvalidContextSize(settings.context_size));
    }

    if settings.server_port < 1024 {
        return Err(SettingsError::InvalidPort(settings.server_port));
    }

    if settings.default_quant_level.trim().is_empty() {
        return Err(SettingsError::EmptyQuantLevel);
    }

    let paths = [
        ("toolchain_root", &settings.toolchain_root),
        ("alt_root", &settings.alt_root),
        ("models_dir", &settings.models_dir),
        ("scripts_dir", &settings.scripts_dir),
    ];
    if let Some((name, _)) = paths.iter().find(|(_, p)| p.as_os_str().is_empty()) {
        return Err(SettingsError::EmptyPath(name));
    }

    Ok(())
}
