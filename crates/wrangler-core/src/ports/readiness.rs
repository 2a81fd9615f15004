//! HTTP probe port used by the readiness prober.

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a single probe attempt. Never surfaced to hosts; the prober
/// treats every variant as "not ready yet".
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("unreadable response body: {0}")]
    Body(String),
}

/// Issues one HTTP GET and returns the response body on a 2xx status.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn get(&self, url: &str) -> Result<String, ProbeError>;
}
