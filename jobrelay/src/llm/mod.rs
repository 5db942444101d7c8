//! LLM bridge.
//!
//! Request/response types for the hosted-LLM call and the client trait the
//! agent endpoint talks through.

pub mod anthropic;

pub use anthropic::AnthropicClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A tool the model may call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool input.
    pub input_schema: serde_json::Value,
}

/// One block of model output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text.
    Text { text: String },
    /// The model wants to call a tool.
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
}

/// The model's reply to a single prompt.
#[derive(Debug, Clone)]
pub struct LlmReply {
    pub blocks: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}

/// LLM client trait.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single user prompt with the given tools attached.
    async fn complete(&self, prompt: &str, tools: &[ToolDefinition]) -> Result<LlmReply>;
}
