//! Job database model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Job database model.
/// One unit of deferred work: an identifier, an opaque payload, and a status.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct JobRecord {
    /// Producer-assigned unique identifier.
    pub id: String,
    /// JSON blob with the producer-supplied parameters.
    /// The store never interprets its contents.
    pub params: String,
    /// Status: queued, running, completed, failed.
    pub status: String,
    /// RFC 3339 timestamp set at insertion, immutable.
    pub created_at: String,
    /// RFC 3339 timestamp set when the job transitions to running.
    pub processed_at: Option<String>,
    /// Error message, set only on transition to failed.
    pub error: Option<String>,
}

impl JobRecord {
    pub fn new(id: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            params: params.into(),
            status: JobStatus::Queued.as_str().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            processed_at: None,
            error: None,
        }
    }

    pub fn get_status(&self) -> Option<JobStatus> {
        JobStatus::parse(&self.status)
    }

    /// Deserialize the opaque params payload.
    pub fn parse_params(&self) -> crate::Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.params)?)
    }
}

/// Job status values.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Job is queued and waiting to be picked up by a worker.
    Queued,
    /// Job has been claimed by exactly one worker.
    Running,
    /// Job finished successfully.
    Completed,
    /// Job finished with an error.
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Check if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}
