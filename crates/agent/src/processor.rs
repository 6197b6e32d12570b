//! Assistant response processor.
//!
//! One call to [`AssistantProcessor::process`] runs a single assistant turn:
//!
//! 1. validate the assistant (fatal, nothing else happens on failure)
//! 2. reset per-turn state
//! 3. hand the turn to the agent runner when the assistant delegates to an agent
//! 4. resolve the system prompt; without one, skip to the final response
//! 5. ask the model in structured mode; a plain chat reply ends the turn
//! 6. dispatch the returned actions one by one, in order
//! 7. on failure in 4..=6: log, roll back the latest action, then rethrow or
//!    answer with the assistant's error template
//! 8. ask the model for the final reply in normal mode

use std::sync::Arc;

use quill_core::config::AppConfig;
use quill_core::{
    AssistantConfig, AssistantValidator, AuditCategory, AuditEvent, AuditOutcome, AuditSink,
    ChatOutput, ConversationState, InvalidAssistantError, StructuralValidator,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::actions::{ActionBatch, ActionContext, ActionError, ActionPlugin, ActionRegistry};
use crate::agent_runner::{AgentError, AgentRequest, AgentRunner};
use crate::llm::{AssistantRequest, MessageMode, ModelCaller, ModelError, ModelReply};
use crate::logging::{ErrorLogger, TracingErrorLogger};
use crate::prompt::{FilePromptSource, PromptSource};
use crate::provider::{ProviderError, ProviderResolver};

pub const STRUCTURED_RESULTS_KEY: &str = "structured_results";

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    InvalidAssistant(#[from] InvalidAssistantError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error("rollback failed ({rollback}) while recovering from: {source}")]
    RollbackFailed {
        #[source]
        source: Box<ProcessError>,
        rollback: ActionError,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum ProcessResult {
    Reply(ChatOutput),
    /// A recovered failure rendered through the assistant's error template.
    Failed(ChatOutput),
}

impl ProcessResult {
    pub fn output(&self) -> &ChatOutput {
        match self {
            Self::Reply(output) | Self::Failed(output) => output,
        }
    }

    pub fn into_output(self) -> ChatOutput {
        match self {
            Self::Reply(output) | Self::Failed(output) => output,
        }
    }

    pub fn text(&self) -> &str {
        self.output().text()
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessorSettings {
    /// Per-assistant prompts are honoured only when this is set.
    pub custom_prompts: bool,
    pub verbose: bool,
    pub log_channel: String,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self { custom_prompts: false, verbose: false, log_channel: "ai_assistant_api".to_string() }
    }
}

impl ProcessorSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            custom_prompts: config.assistant.custom_prompts,
            verbose: config.assistant.verbose,
            log_channel: config.assistant.log_channel.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct TurnState {
    structured_results: Vec<Value>,
    output_contexts: Vec<String>,
    using_action: bool,
}

enum TurnStep {
    Reply(ChatOutput),
    Continue(Option<String>),
}

pub struct AssistantProcessor {
    settings: ProcessorSettings,
    validator: Arc<dyn AssistantValidator>,
    prompts: Arc<dyn PromptSource>,
    model: Arc<dyn ModelCaller>,
    providers: Arc<dyn ProviderResolver>,
    actions: Arc<ActionRegistry>,
    logger: Arc<dyn ErrorLogger>,
    agent_runner: Option<Arc<dyn AgentRunner>>,
    audit: Option<Arc<dyn AuditSink>>,
    state: TurnState,
}

impl AssistantProcessor {
    pub fn new(
        model: Arc<dyn ModelCaller>,
        providers: Arc<dyn ProviderResolver>,
        actions: Arc<ActionRegistry>,
    ) -> Self {
        Self {
            settings: ProcessorSettings::default(),
            validator: Arc::new(StructuralValidator),
            prompts: Arc::new(FilePromptSource::new(quill_core::config::DEFAULT_PROMPT_PATH)),
            model,
            providers,
            actions,
            logger: Arc::new(TracingErrorLogger),
            agent_runner: None,
            audit: None,
            state: TurnState::default(),
        }
    }

    /// Settings and bundled prompt location taken from the loaded configuration.
    pub fn from_config(
        config: &AppConfig,
        model: Arc<dyn ModelCaller>,
        providers: Arc<dyn ProviderResolver>,
        actions: Arc<ActionRegistry>,
    ) -> Self {
        Self::new(model, providers, actions)
            .with_settings(ProcessorSettings::from_config(config))
            .with_prompt_source(Arc::new(FilePromptSource::new(
                config.assistant.prompt_path.clone(),
            )))
    }

    pub fn with_settings(mut self, settings: ProcessorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn AssistantValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_prompt_source(mut self, prompts: Arc<dyn PromptSource>) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ErrorLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_agent_runner(mut self, runner: Arc<dyn AgentRunner>) -> Self {
        self.agent_runner = Some(runner);
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn settings(&self) -> &ProcessorSettings {
        &self.settings
    }

    /// Structured values produced by the actions of the latest turn.
    pub fn structured_results(&self) -> &[Value] {
        &self.state.structured_results
    }

    pub fn output_contexts(&self) -> &[String] {
        &self.state.output_contexts
    }

    /// Whether the latest turn reached at least one well-formed action record.
    pub fn used_action(&self) -> bool {
        self.state.using_action
    }

    pub async fn process(
        &mut self,
        assistant: &AssistantConfig,
        conversation: &ConversationState,
    ) -> Result<ProcessResult, ProcessError> {
        self.validator.validate(assistant)?;
        self.state = TurnState::default();

        if let (Some(agent_ref), Some(runner)) = (assistant.agent(), self.agent_runner.clone()) {
            let provider = self.providers.resolve(assistant)?;
            info!(
                event_name = "assistant.agent.delegated",
                assistant_id = %assistant.id,
                thread_id = %conversation.thread_id,
                agent_ref,
                "delegating turn to agent runner"
            );
            let output = runner
                .run_as_agent(AgentRequest {
                    agent_ref,
                    history: &conversation.messages,
                    provider: &provider,
                    thread_key: conversation.thread_id.as_str(),
                    verbose: self.settings.verbose,
                })
                .await?;
            self.emit(
                AuditEvent::new(
                    assistant.id.clone(),
                    conversation.thread_id.clone(),
                    "agent.delegated",
                    AuditCategory::Agent,
                    AuditOutcome::Success,
                )
                .with_metadata("agent_ref", agent_ref),
            );
            return Ok(ProcessResult::Reply(output));
        }

        let mut in_flight = None;
        let system_prompt = match self.dispatch(assistant, conversation, &mut in_flight).await {
            Ok(TurnStep::Reply(output)) => return Ok(ProcessResult::Reply(output)),
            Ok(TurnStep::Continue(system_prompt)) => system_prompt,
            Err(error) => return self.recover(assistant, conversation, error, in_flight).await,
        };

        let output = self.final_response(assistant, conversation, system_prompt.as_deref()).await?;
        Ok(ProcessResult::Reply(output))
    }

    async fn dispatch(
        &mut self,
        assistant: &AssistantConfig,
        conversation: &ConversationState,
        in_flight: &mut Option<Box<dyn ActionPlugin>>,
    ) -> Result<TurnStep, ProcessError> {
        let Some(system_prompt) = self.resolve_system_prompt(assistant, conversation) else {
            return Ok(TurnStep::Continue(None));
        };

        let reply = self
            .model
            .assistant_message(self.request(
                assistant,
                conversation,
                Some(&system_prompt),
                MessageMode::Structured,
            ))
            .await?;
        let payload = match reply {
            ModelReply::Chat(output) => return Ok(TurnStep::Reply(output)),
            ModelReply::Structured(payload) => payload,
        };

        let provider = self.providers.resolve(assistant)?;
        let batch = ActionBatch::from_payload(&payload);
        debug!(
            event_name = "assistant.actions.parsed",
            assistant_id = %assistant.id,
            thread_id = %conversation.thread_id,
            entries = batch.len(),
            skipped = batch.skipped(),
            "structured reply parsed"
        );

        for mut record in batch.into_valid() {
            self.state.using_action = true;
            let settings = assistant.action_settings(record.plugin());
            let instance = in_flight.insert(self.actions.create(record.plugin(), &settings)?);
            instance.configure(ActionContext {
                assistant: assistant.clone(),
                thread_id: conversation.thread_id.clone(),
                provider: self.providers.instantiate(&provider)?,
                messages: conversation.messages.clone(),
            });
            record.stamp(&assistant.id, &conversation.thread_id);

            let output = instance.trigger(record.action(), &record).await?;
            info!(
                event_name = "assistant.action.triggered",
                assistant_id = %assistant.id,
                thread_id = %conversation.thread_id,
                plugin = record.plugin(),
                action = record.action(),
                "action triggered"
            );
            self.emit(
                AuditEvent::new(
                    assistant.id.clone(),
                    conversation.thread_id.clone(),
                    "action.triggered",
                    AuditCategory::Action,
                    AuditOutcome::Success,
                )
                .with_metadata("plugin", record.plugin())
                .with_metadata("action", record.action()),
            );

            if let Some(structured) = output.structured {
                self.state.structured_results.push(structured);
            }
            if let Some(context) = output.context {
                self.state.output_contexts.push(context);
            }
        }

        Ok(TurnStep::Continue(Some(system_prompt)))
    }

    fn resolve_system_prompt(
        &self,
        assistant: &AssistantConfig,
        conversation: &ConversationState,
    ) -> Option<String> {
        let prompt = if self.settings.custom_prompts {
            assistant.system_prompt.clone()
        } else {
            match self.prompts.read_bundled_prompt() {
                Ok(prompt) => Some(prompt),
                Err(error) => {
                    // no prompt: the turn skips straight to the final response
                    warn!(
                        event_name = "assistant.prompt.unavailable",
                        assistant_id = %assistant.id,
                        thread_id = %conversation.thread_id,
                        error = %error,
                        "bundled system prompt unavailable, skipping actions"
                    );
                    self.emit(
                        AuditEvent::new(
                            assistant.id.clone(),
                            conversation.thread_id.clone(),
                            "prompt.unavailable",
                            AuditCategory::Prompt,
                            AuditOutcome::Degraded,
                        )
                        .with_metadata("error", error.to_string()),
                    );
                    None
                }
            }
        };

        prompt.filter(|prompt| !prompt.is_empty())
    }

    async fn recover(
        &mut self,
        assistant: &AssistantConfig,
        conversation: &ConversationState,
        error: ProcessError,
        in_flight: Option<Box<dyn ActionPlugin>>,
    ) -> Result<ProcessResult, ProcessError> {
        let message = error.to_string();
        self.logger.error(&self.settings.log_channel, &message);
        let error_message = assistant.render_error_message(&message);

        if let Some(mut instance) = in_flight {
            if let Err(rollback) = instance.rollback().await {
                return Err(ProcessError::RollbackFailed { source: Box::new(error), rollback });
            }
            self.emit(
                AuditEvent::new(
                    assistant.id.clone(),
                    conversation.thread_id.clone(),
                    "action.rolled_back",
                    AuditCategory::Action,
                    AuditOutcome::Success,
                ),
            );
        }

        self.emit(
            AuditEvent::new(
                assistant.id.clone(),
                conversation.thread_id.clone(),
                "process.failed",
                AuditCategory::Process,
                AuditOutcome::Failed,
            )
            .with_metadata("error", message)
            .with_metadata("rethrown", assistant.throw_on_error.to_string()),
        );

        if assistant.throw_on_error {
            return Err(error);
        }

        Ok(ProcessResult::Failed(ChatOutput::error(error_message)))
    }

    async fn final_response(
        &self,
        assistant: &AssistantConfig,
        conversation: &ConversationState,
        system_prompt: Option<&str>,
    ) -> Result<ChatOutput, ProcessError> {
        let reply = self
            .model
            .assistant_message(self.request(
                assistant,
                conversation,
                system_prompt,
                MessageMode::Normal,
            ))
            .await?;

        let mut output = match reply {
            ModelReply::Chat(output) => output,
            ModelReply::Structured(_) => return Err(ModelError::UnexpectedStructured.into()),
        };
        if !self.state.structured_results.is_empty() {
            output.metadata.insert(
                STRUCTURED_RESULTS_KEY.to_string(),
                Value::Array(self.state.structured_results.clone()),
            );
        }

        Ok(output)
    }

    fn request<'a>(
        &'a self,
        assistant: &'a AssistantConfig,
        conversation: &'a ConversationState,
        system_prompt: Option<&'a str>,
        mode: MessageMode,
    ) -> AssistantRequest<'a> {
        AssistantRequest {
            assistant,
            thread_id: &conversation.thread_id,
            system_prompt,
            messages: &conversation.messages,
            output_contexts: &self.state.output_contexts,
            structured_results: &self.state.structured_results,
            mode,
        }
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(audit) = &self.audit {
            audit.emit(event);
        }
    }
}
