//! Executables provided by the llama.cpp toolchain.

use std::env::consts::EXE_SUFFIX;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Role of a toolchain executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolRole {
    /// The inference server (`llama-server`).
    Server,
    /// The re-encoding tool (`llama-quantize`).
    Quantize,
}

impl ToolRole {
    /// Canonical binary name for error messages.
    pub const fn binary_name(self) -> &'static str {
        match self {
            Self::Server => "llama-server",
            Self::Quantize => "llama-quantize",
        }
    }

    /// Relative locations searched under a toolchain root, in priority order.
    pub fn candidate_subpaths(self) -> Vec<PathBuf> {
        let names: &[&str] = match self {
            Self::Server => &[
                "build/bin/llama-server",
                "build/bin/server",
                "llama-server",
                "server",
            ],
            Self::Quantize => &["build/bin/llama-quantize", "llama-quantize", "quantize"],
        };
        names
            .iter()
            .map(|name| PathBuf::from(format!("{name}{EXE_SUFFIX}")))
            .collect()
    }
}

impl std::fmt::Display for ToolRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary_name())
    }
}
