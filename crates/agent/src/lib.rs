//! Assistant runtime - one structured turn per request.
//!
//! The processor asks the model for a structured reply, dispatches the actions
//! it lists to registered plugins, and then asks for the final chat reply with
//! the action results in context.
//!
//! # Architecture
//!
//! 1. **Validation** (`quill_core::validation`) - reject malformed assistants up front
//! 2. **Delegation** (`agent_runner`) - assistants bound to an agent skip the loop
//! 3. **Prompt** (`prompt`) - bundled or per-assistant system prompt
//! 4. **Dispatch** (`actions`) - typed records routed through the plugin registry
//! 5. **Recovery** (`processor`) - log, roll back, then rethrow or render the error template
//!
//! # Key Types
//!
//! - `AssistantProcessor` - the turn loop
//! - `ModelCaller` - structured/normal assistant message calls
//! - `ActionPlugin` - configure, trigger and roll back one action
//! - `ProviderResolver` - provider/model resolution and client creation
//!
//! # Safety Principle
//!
//! Model output is untrusted. Action entries are parsed at the boundary and
//! anything malformed is skipped before a plugin ever sees it.

pub mod actions;
pub mod agent_runner;
pub mod field_context;
pub mod llm;
pub mod logging;
pub mod processor;
pub mod prompt;
pub mod provider;

pub use actions::{
    parse_action_record, ActionBatch, ActionContext, ActionError, ActionOutput, ActionPlugin,
    ActionRecord, ActionRegistry, MalformedAction, ParsedAction,
};
pub use agent_runner::{AgentError, AgentRequest, AgentRunner};
pub use llm::{AssistantRequest, LlmClient, MessageMode, ModelCaller, ModelError, ModelReply};
pub use logging::{ErrorLogger, InMemoryErrorLogger, TracingErrorLogger};
pub use processor::{AssistantProcessor, ProcessError, ProcessResult, ProcessorSettings};
pub use prompt::{FilePromptSource, PromptError, PromptSource};
pub use provider::{
    ProviderError, ProviderInstance, ProviderModel, ProviderRegistry, ProviderResolver,
};
