//! Tool-call dispatch.
//!
//! Defines the `enqueue_job` tool advertised to the model and the HTTP
//! relay that carries accepted tool calls to the dispatch endpoint. The
//! relay keeps the producer in a separate process from the agent bridge;
//! the default configuration points both at the same server.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

use crate::llm::ToolDefinition;
use crate::{Error, Result};

/// Name of the job-enqueue tool.
pub const ENQUEUE_JOB_TOOL: &str = "enqueue_job";

/// Relay request timeout in seconds.
const DISPATCH_TIMEOUT_SECS: u64 = 30;

/// Tool definition advertised to the model.
pub fn enqueue_job_tool() -> ToolDefinition {
    ToolDefinition {
        name: ENQUEUE_JOB_TOOL.to_string(),
        description: "Queue a background job for later out-of-band processing. \
                      Supply the job parameters as a JSON object."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "string",
                    "description": "Optional unique job identifier; generated when omitted."
                },
                "params": {
                    "type": "object",
                    "description": "Arbitrary job parameters, stored opaquely."
                }
            },
            "required": ["params"]
        }),
    }
}

/// The `enqueue_job` payload, as produced by the model and accepted by the
/// dispatch endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueJobCall {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub params: Value,
}

impl EnqueueJobCall {
    /// Parse and validate a raw tool-call input.
    pub fn from_tool_input(input: &Value) -> Result<Self> {
        let call: Self = serde_json::from_value(input.clone())
            .map_err(|e| Error::validation(format!("malformed enqueue_job input: {e}")))?;
        if !call.params.is_object() {
            return Err(Error::validation("enqueue_job params must be a JSON object"));
        }
        Ok(call)
    }
}

/// Acknowledgment returned by the dispatch endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueueJobAck {
    pub job_id: String,
}

/// HTTP relay to the dispatch endpoint.
pub struct DispatchClient {
    client: Client,
    base_url: String,
}

impl DispatchClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DISPATCH_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Relay a validated tool call; returns the id of the enqueued job.
    pub async fn enqueue(&self, call: &EnqueueJobCall) -> Result<EnqueueJobAck> {
        let response = self
            .client
            .post(format!("{}/api/dispatch/enqueue", self.base_url))
            .json(call)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Other(format!(
                "dispatch endpoint returned HTTP {status}: {body}"
            )));
        }

        Ok(response.json().await?)
    }
}
