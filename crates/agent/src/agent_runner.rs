use async_trait::async_trait;
use quill_core::{ChatMessage, ChatOutput};
use thiserror::Error;

use crate::provider::ProviderModel;

#[derive(Clone, Copy, Debug)]
pub struct AgentRequest<'a> {
    pub agent_ref: &'a str,
    pub history: &'a [ChatMessage],
    pub provider: &'a ProviderModel,
    pub thread_key: &'a str,
    pub verbose: bool,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("agent `{0}` is not available")]
    UnknownAgent(String),
    #[error("agent `{agent}` failed: {message}")]
    Failed { agent: String, message: String },
}

/// Runs a whole turn on behalf of an assistant that delegates to an agent.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run_as_agent(&self, request: AgentRequest<'_>) -> Result<ChatOutput, AgentError>;
}
