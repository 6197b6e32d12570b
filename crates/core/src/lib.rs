pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod validation;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink};
pub use domain::assistant::{
    ActionSettings, AssistantConfig, AssistantId, ERROR_MESSAGE_PLACEHOLDER,
};
pub use domain::conversation::{ChatMessage, ChatOutput, ChatRole, ConversationState, ThreadId};
pub use errors::InvalidAssistantError;
pub use validation::{AssistantValidator, StructuralValidator};
