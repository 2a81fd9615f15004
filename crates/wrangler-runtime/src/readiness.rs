//! Readiness probing for freshly spawned servers.
//!
//! Startup time varies wildly with model size (weights are loaded into
//! memory or onto the GPU before the HTTP listener answers), so the prober
//! retries silently on a fixed interval and only reports exhaustion.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::sleep;
use tracing::{debug, info};
use wrangler_core::{HttpProbe, ProbeError};

/// Fixed-interval retry parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay before every attempt, including the first.
    pub interval: Duration,
    pub max_attempts: u32,
    /// Timeout applied to each individual request.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_attempts: 30,
            attempt_timeout: Duration::from_secs(2),
        }
    }
}

/// Readiness predicate for `/v1/models`: an `object: "list"` document or a
/// non-empty `data` field.
pub fn models_listing_ready(body: &str) -> bool {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    if json.get("object").and_then(serde_json::Value::as_str) == Some("list") {
        return true;
    }
    match json.get("data") {
        Some(serde_json::Value::Array(items)) => !items.is_empty(),
        Some(serde_json::Value::Object(map)) => !map.is_empty(),
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(serde_json::Value::Null) | None => false,
        Some(_) => true,
    }
}

/// Poll `url` until `is_ready` accepts a response body.
///
/// Connection errors, timeouts, bad statuses and non-matching bodies are all
/// swallowed. Returns `false` only once `policy.max_attempts` is exhausted.
pub async fn wait_ready<F>(probe: &dyn HttpProbe, url: &str, is_ready: F, policy: RetryPolicy) -> bool
where
    F: Fn(&str) -> bool + Send,
{
    info!(url = %url, "Waiting for server readiness");

    for attempt in 1..=policy.max_attempts {
        sleep(policy.interval).await;

        let outcome = tokio::time::timeout(policy.attempt_timeout, probe.get(url))
            .await
            .unwrap_or(Err(ProbeError::Timeout));

        match outcome {
            Ok(body) if is_ready(&body) => {
                info!(url = %url, attempt, "Server is ready");
                return true;
            }
            Ok(body) => {
                debug!(attempt, body = %body.chars().take(120).collect::<String>(), "readiness body not accepted, retrying");
            }
            Err(e) => {
                debug!(attempt, error = %e, "readiness probe failed, retrying");
            }
        }
    }

    debug!(url = %url, attempts = policy.max_attempts, "readiness attempts exhausted");
    false
}

/// [`HttpProbe`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestProbe {
    client: Client,
}

impl ReqwestProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpProbe for ReqwestProbe {
    async fn get(&self, url: &str) -> Result<String, ProbeError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Timeout
            } else {
                ProbeError::Connect(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status(status.as_u16()));
        }

        response
            .text()
            .await
            .map_err(|e| ProbeError::Body(e.to_string()))
    }
}
