use anyhow::Result;
use async_trait::async_trait;
use quill_core::{AssistantConfig, ChatMessage, ChatOutput, ThreadId};
use serde_json::Value;
use thiserror::Error;

/// Raw completion client behind a provider instance.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageMode {
    /// The reply may carry an `actions` list next to the chat message.
    Structured,
    Normal,
}

/// One "assistant message" request for the current turn.
#[derive(Clone, Copy, Debug)]
pub struct AssistantRequest<'a> {
    pub assistant: &'a AssistantConfig,
    pub thread_id: &'a ThreadId,
    pub system_prompt: Option<&'a str>,
    pub messages: &'a [ChatMessage],
    pub output_contexts: &'a [String],
    pub structured_results: &'a [Value],
    pub mode: MessageMode,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ModelReply {
    Chat(ChatOutput),
    Structured(Value),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{0}")]
    Request(String),
    #[error("model returned a structured payload for a normal-mode request")]
    UnexpectedStructured,
    #[error(transparent)]
    Client(#[from] anyhow::Error),
}

#[async_trait]
pub trait ModelCaller: Send + Sync {
    async fn assistant_message(
        &self,
        request: AssistantRequest<'_>,
    ) -> Result<ModelReply, ModelError>;
}
