//! Language model collaborator.
//!
//! Services talk to the model through [`LanguageModel`] so that the HTTP
//! client can be swapped for a scripted one in tests. Every call made by a
//! service goes through [`complete_with_timeout`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod claude;

pub use claude::ClaudeClient;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A typed function the model may call; its input is the structured payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub system: String,
    pub messages: Vec<ChatMessage>,
    pub tool: Option<ToolSpec>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    /// Concatenated text blocks.
    pub text: String,
    /// Input of the first call to the requested tool, if the model made one.
    pub tool_input: Option<Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model call timed out")]
    Timeout,

    #[error("model transport error: {0}")]
    Transport(String),

    #[error("model API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed model response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for ModelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ModelError::Timeout
        } else {
            ModelError::Transport(e.to_string())
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &ModelRequest) -> Result<ModelReply, ModelError>;
}

pub async fn complete_with_timeout(
    model: &dyn LanguageModel,
    request: &ModelRequest,
    timeout: Duration,
) -> Result<ModelReply, ModelError> {
    match tokio::time::timeout(timeout, model.complete(request)).await {
        Ok(result) => result,
        Err(_) => Err(ModelError::Timeout),
    }
}
