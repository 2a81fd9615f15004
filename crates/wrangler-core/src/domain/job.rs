//! Background job identity and terminal outcomes.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Generate a fresh job id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Short form used in logs and listings.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Kind of background job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    /// Model acquisition through a download helper script.
    Download,
    /// Model re-encoding through the quantize binary.
    Quantize,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Download => f.write_str("download"),
            Self::Quantize => f.write_str("quantize"),
        }
    }
}

/// Terminal status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Succeeded,
    Failed,
    /// Terminated on request. Not an error.
    Cancelled,
}

/// Final report of a job, delivered exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub id: JobId,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Human-readable failure message (only for `Failed`).
    pub message: Option<String>,
    /// Process exit code when one was observed.
    pub exit_code: Option<i32>,
}

impl JobOutcome {
    pub const fn succeeded(id: JobId, kind: JobKind) -> Self {
        Self {
            id,
            kind,
            status: JobStatus::Succeeded,
            message: None,
            exit_code: Some(0),
        }
    }

    pub fn failed(
        id: JobId,
        kind: JobKind,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self {
            id,
            kind,
            status: JobStatus::Failed,
            message: Some(message.into()),
            exit_code,
        }
    }

    pub const fn cancelled(id: JobId, kind: JobKind, exit_code: Option<i32>) -> Self {
        Self {
            id,
            kind,
            status: JobStatus::Cancelled,
            message: None,
            exit_code,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Succeeded
    }
}

/// Listing entry for a job that is still running.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub id: JobId,
    pub kind: JobKind,
    /// URL, repository id, registry name or model path the job works on.
    pub target: String,
    /// Where the job is expected to write its result.
    pub output_path_hint: Option<PathBuf>,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_ids_are_unique_and_parse_back() {
        let a = JobId::new();
        let b = JobId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().parse::<JobId>().unwrap(), a);
        assert_eq!(a.short().len(), 8);
    }

    #[test]
    fn cancelled_is_not_success() {
        let outcome = JobOutcome::cancelled(JobId::new(), JobKind::Download, None);
        assert!(!outcome.is_success());
        assert!(outcome.message.is_none());
    }
}
