//! API request/response models.

use serde::{Deserialize, Serialize};

use crate::database::models::JobRecord;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Agent prompt request.
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

/// Events streamed to the agent caller over SSE.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// A text block from the model.
    Text { text: String },
    /// The model issued a tool call.
    ToolCall {
        name: String,
        input: serde_json::Value,
    },
    /// A tool call was relayed and the job is durably queued.
    JobEnqueued { job_id: String },
    /// Something went wrong mid-stream.
    Error { message: String },
    /// Terminal event; the stream ends after this.
    Done,
}

/// A job as exposed over the API.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub params: serde_json::Value,
    pub status: String,
    pub created_at: String,
    pub processed_at: Option<String>,
    pub error: Option<String>,
}

impl From<&JobRecord> for JobResponse {
    fn from(record: &JobRecord) -> Self {
        let params = record.parse_params().unwrap_or_else(|e| {
            tracing::warn!(job_id = %record.id, error = %e, "stored params are not valid JSON");
            serde_json::Value::Null
        });

        Self {
            id: record.id.clone(),
            params,
            status: record.status.clone(),
            created_at: record.created_at.clone(),
            processed_at: record.processed_at.clone(),
            error: record.error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_response_from_record() {
        let record = JobRecord::new("job-1", r#"{"kind":"export"}"#);
        let response = JobResponse::from(&record);
        assert_eq!(response.id, "job-1");
        assert_eq!(response.params["kind"], "export");
        assert_eq!(response.status, "queued");
    }

    #[test]
    fn test_agent_event_serialization() {
        let event = AgentEvent::JobEnqueued {
            job_id: "job-9".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("job_enqueued"));
        assert!(json.contains("job-9"));
    }
}
