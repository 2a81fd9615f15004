//! Canonical path resolution for wrangler data directories.
//!
//! - `wrangler_home()` is `~/.llama-wrangler`, the default home of the
//!   managed toolchain and the models directory
//! - `data_root()` holds settings and helper scripts and can be redirected
//!   with `WRANGLER_DATA_DIR`
//!
//! Nothing here creates directories. Adapters create what they write to.

use std::env;
use std::path::PathBuf;

use thiserror::Error;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "WRANGLER_DATA_DIR";

const HOME_DIR_NAME: &str = ".llama-wrangler";
const ALT_INSTALL_DIR_NAME: &str = ".METALlama.cpp";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Errors that can occur during path resolution.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot determine home directory")]
    NoHomeDir,

    #[error("Path cannot be empty")]
    EmptyPath,
}

fn home_dir() -> Result<PathBuf, PathError> {
    dirs::home_dir().ok_or(PathError::NoHomeDir)
}

/// `~/.llama-wrangler`
pub fn wrangler_home() -> Result<PathBuf, PathError> {
    Ok(home_dir()?.join(HOME_DIR_NAME))
}

/// Directory for settings and helper scripts.
///
/// Resolution order:
/// 1. `WRANGLER_DATA_DIR` environment variable
/// 2. `~/.llama-wrangler`
pub fn data_root() -> Result<PathBuf, PathError> {
    match env::var(DATA_DIR_ENV) {
        Ok(path) if path.trim().is_empty() => Err(PathError::EmptyPath),
        Ok(path) => Ok(PathBuf::from(path)),
        Err(_) => wrangler_home(),
    }
}

pub fn default_models_dir() -> Result<PathBuf, PathError> {
    Ok(wrangler_home()?.join("models"))
}

/// Managed llama.cpp checkout.
pub fn default_toolchain_root() -> Result<PathBuf, PathError> {
    Ok(wrangler_home()?.join("llama.cpp"))
}

/// Alternate (Metal-optimised) installation, `~/.METALlama.cpp`.
pub fn default_alt_root() -> Result<PathBuf, PathError> {
    Ok(home_dir()?.join(ALT_INSTALL_DIR_NAME))
}

pub fn default_scripts_dir() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join("scripts"))
}

pub fn settings_file_path() -> Result<PathBuf, PathError> {
    Ok(data_root()?.join(SETTINGS_FILE_NAME))
}
