use crate::domain::assistant::AssistantConfig;
use crate::errors::InvalidAssistantError;

/// Decides whether an assistant definition is complete enough to run.
pub trait AssistantValidator: Send + Sync {
    fn validate(&self, assistant: &AssistantConfig) -> Result<(), InvalidAssistantError>;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct StructuralValidator;

impl AssistantValidator for StructuralValidator {
    fn validate(&self, assistant: &AssistantConfig) -> Result<(), InvalidAssistantError> {
        let id = assistant.id.as_str();
        if id.is_empty() {
            return Err(InvalidAssistantError::MissingId);
        }
        if !is_machine_name(id) {
            return Err(InvalidAssistantError::InvalidId(id.to_string()));
        }
        if assistant.label.trim().is_empty() {
            return Err(InvalidAssistantError::MissingLabel(id.to_string()));
        }
        if assistant.error_message.trim().is_empty() {
            return Err(InvalidAssistantError::MissingErrorMessage(id.to_string()));
        }
        if assistant.actions_enabled.keys().any(|plugin_id| plugin_id.trim().is_empty()) {
            return Err(InvalidAssistantError::EmptyActionPlugin(id.to_string()));
        }
        if assistant.agent_ref.is_some() && assistant.agent().is_none() {
            return Err(InvalidAssistantError::EmptyAgentRef(id.to_string()));
        }

        Ok(())
    }
}

fn is_machine_name(value: &str) -> bool {
    value.chars().all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_')
}
