//! OS service manager integration port.
//!
//! On some hosts the inference server is kept alive by the operating system's
//! service manager. When that is the case the supervisor must not spawn a
//! competing process; it hands the model choice to the service manager and
//! reports the result as a foreign server.

use std::path::Path;

use async_trait::async_trait;

use crate::error::OrchestratorError;

#[async_trait]
pub trait ExternalSupervisor: Send + Sync {
    /// Whether a service definition for the server is installed.
    fn is_active(&self) -> bool;

    /// Make the managed server load `model_path` and restart it.
    ///
    /// Returns the model name the managed server will report.
    async fn switch_model(&self, model_path: &Path) -> Result<String, OrchestratorError>;
}
