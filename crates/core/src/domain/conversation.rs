use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self { role, text: text.into() }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Assistant, text)
    }
}

/// Message history for one thread. Only the caller mutates it, between calls.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub thread_id: ThreadId,
    pub messages: Vec<ChatMessage>,
}

impl ConversationState {
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self { thread_id: ThreadId(thread_id.into()), messages: Vec::new() }
    }

    pub fn with_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn last_user_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|message| message.role == ChatRole::User)
    }
}

/// Output of a model call or of an agent run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatOutput {
    pub message: ChatMessage,
    pub raw: Value,
    pub metadata: Map<String, Value>,
}

impl ChatOutput {
    pub fn new(message: ChatMessage) -> Self {
        Self { message, raw: Value::Null, metadata: Map::new() }
    }

    /// Error-shaped output: one assistant message and the text as the raw payload.
    pub fn error(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            raw: Value::Array(vec![Value::String(text.clone())]),
            message: ChatMessage::assistant(text),
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn text(&self) -> &str {
        &self.message.text
    }
}
