//! Host dependency report.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;
use wrangler_core::Settings;

use crate::locator::is_built_toolchain;
use crate::supervisor::CUDA_TOOLKIT_MARKER;

/// System-wide install location checked as a last resort.
const SYSTEM_TOOLCHAIN_ROOT: &str = "/usr/local/llama.cpp";

/// What the host has installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyReport {
    /// First root holding a built server binary.
    pub toolchain_root: Option<PathBuf>,
    /// Every root that was checked, in order.
    pub searched: Vec<PathBuf>,
    /// `python3` resolved on `PATH`.
    pub python: Option<PathBuf>,
    pub cuda_toolkit: bool,
}

impl DependencyReport {
    pub const fn toolchain_installed(&self) -> bool {
        self.toolchain_root.is_some()
    }

    /// Whether downloads can run.
    pub const fn python_available(&self) -> bool {
        self.python.is_some()
    }
}

/// Toolchain roots checked by the report, in order.
pub fn toolchain_roots(settings: &Settings) -> Vec<PathBuf> {
    let mut roots = vec![settings.toolchain_root.clone(), settings.alt_root.clone()];
    if let Some(home) = dirs::home_dir() {
        roots.push(home.join("llama.cpp"));
    }
    roots.push(PathBuf::from(SYSTEM_TOOLCHAIN_ROOT));
    let mut seen = HashSet::new();
    roots.retain(|root| seen.insert(root.clone()));
    roots
}

/// Check the toolchain, the Python interpreter and CUDA.
pub fn check_dependencies(settings: &Settings) -> DependencyReport {
    let searched = toolchain_roots(settings);
    let toolchain_root = searched.iter().find(|root| is_built_toolchain(root)).cloned();
    let python = which::which("python3").ok();
    let cuda_toolkit = Path::new(CUDA_TOOLKIT_MARKER).exists();

    debug!(
        toolchain = ?toolchain_root,
        python = ?python,
        cuda = cuda_toolkit,
        "checked host dependencies"
    );

    DependencyReport {
        toolchain_root,
        searched,
        python,
        cuda_toolkit,
    }
}
