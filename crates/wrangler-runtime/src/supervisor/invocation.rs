//! Server command line construction.

use std::path::{Path, PathBuf};

use crate::process::LaunchSpec;

/// Marker whose presence enables GPU offload on Linux.
pub const CUDA_TOOLKIT_MARKER: &str = "/usr/local/cuda/bin/nvcc";

/// Layer count requesting full GPU offload.
const FULL_OFFLOAD_LAYERS: &str = "999";

/// Whether the server should offload layers to the GPU on this host.
///
/// Always on macOS (Metal). On Linux only when a CUDA toolkit is installed.
pub fn gpu_offload_available() -> bool {
    if cfg!(target_os = "macos") {
        true
    } else if cfg!(target_os = "linux") {
        Path::new(CUDA_TOOLKIT_MARKER).exists()
    } else {
        false
    }
}

/// Builder for a `llama-server` invocation.
///
/// Produces `-m <model> --port <port> --host 0.0.0.0 -c <ctx> [-ngl 999]`.
#[derive(Debug, Clone)]
pub struct ServerInvocation {
    binary: PathBuf,
    model_path: PathBuf,
    port: u16,
    context_size: u32,
    gpu_offload: bool,
}

impl ServerInvocation {
    pub fn new(binary: impl Into<PathBuf>, model_path: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            binary: binary.into(),
            model_path: model_path.into(),
            port,
            context_size: wrangler_core::DEFAULT_CONTEXT_SIZE,
            gpu_offload: false,
        }
    }

    #[must_use]
    pub const fn context_size(mut self, size: u32) -> Self {
        self.context_size = size;
        self
    }

    #[must_use]
    pub const fn gpu_offload(mut self, enabled: bool) -> Self {
        self.gpu_offload = enabled;
        self
    }

    pub fn build(self) -> LaunchSpec {
        let spec = LaunchSpec::new(self.binary)
            .arg("-m")
            .arg(self.model_path)
            .arg("--port")
            .arg(self.port.to_string())
            .arg("--host")
            .arg("0.0.0.0")
            .arg("-c")
            .arg(self.context_size.to_string());

        if self.gpu_offload {
            spec.arg("-ngl").arg(FULL_OFFLOAD_LAYERS)
        } else {
            spec
        }
    }
}
