//! Remote conversational-assistant service
//!
//! The service is reached through [`AssistantApi`]; [`QueryPipeline`] drives
//! one query through it and renders the outcome.

pub mod openai;
pub mod pipeline;

use std::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

pub use openai::OpenAiAssistants;
pub use pipeline::{PollSettings, QueryPipeline};

/// Opaque handle to a server-side conversation thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextId(pub String);

/// Handle to one asynchronous assistant run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunId(pub String);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a run as reported by the service
///
/// Every non-terminal status (`queued`, `in_progress`, `requires_action`,
/// `cancelling`, ...) maps to `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Failed,
    Cancelled,
    Expired,
    #[serde(other)]
    Pending,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Pending => "pending",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("Assistant API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response: {0}")]
    Unexpected(String),

    #[error("No {0} configured")]
    NotConfigured(&'static str),
}

/// Operations the query pipeline needs from the assistant service
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Create a new conversation context
    async fn create_context(&self) -> Result<ContextId, ApiError>;

    /// Add a user message to the context
    async fn post_user_message(&self, context: &ContextId, text: &str) -> Result<(), ApiError>;

    /// Start a run of the configured assistant against the context
    async fn start_run(&self, context: &ContextId) -> Result<RunId, ApiError>;

    async fn run_status(&self, context: &ContextId, run: &RunId) -> Result<RunStatus, ApiError>;

    /// Most recent message in the context, if any
    async fn latest_message(&self, context: &ContextId) -> Result<Option<ChatMessage>, ApiError>;
}
