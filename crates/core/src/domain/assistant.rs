use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Placeholder substituted with the failure message in `error_message` templates.
pub const ERROR_MESSAGE_PLACEHOLDER: &str = "[error_message]";

/// Plugin-specific settings for one enabled action plugin.
pub type ActionSettings = Map<String, Value>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssistantId(pub String);

impl AssistantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssistantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A configured assistant. Read-only for the whole of one processing call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssistantConfig {
    pub id: AssistantId,
    pub label: String,
    /// When set, the whole turn is delegated to the agent runner.
    #[serde(default)]
    pub agent_ref: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub error_message: String,
    #[serde(default)]
    pub actions_enabled: BTreeMap<String, ActionSettings>,
    #[serde(default)]
    pub throw_on_error: bool,
    #[serde(default)]
    pub llm_provider: Option<String>,
    #[serde(default)]
    pub llm_model: Option<String>,
}

impl AssistantConfig {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: AssistantId(id.into()),
            label: label.into(),
            agent_ref: None,
            system_prompt: None,
            error_message: format!("Something went wrong: {ERROR_MESSAGE_PLACEHOLDER}"),
            actions_enabled: BTreeMap::new(),
            throw_on_error: false,
            llm_provider: None,
            llm_model: None,
        }
    }

    pub fn with_error_message(mut self, template: impl Into<String>) -> Self {
        self.error_message = template.into();
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_agent(mut self, agent_ref: impl Into<String>) -> Self {
        self.agent_ref = Some(agent_ref.into());
        self
    }

    pub fn with_action(mut self, plugin_id: impl Into<String>, settings: ActionSettings) -> Self {
        self.actions_enabled.insert(plugin_id.into(), settings);
        self
    }

    pub fn throwing(mut self, throw_on_error: bool) -> Self {
        self.throw_on_error = throw_on_error;
        self
    }

    /// Settings for `plugin_id`, or an empty set when the plugin is not listed.
    pub fn action_settings(&self, plugin_id: &str) -> ActionSettings {
        self.actions_enabled.get(plugin_id).cloned().unwrap_or_default()
    }

    /// Non-empty agent reference, if any.
    pub fn agent(&self) -> Option<&str> {
        self.agent_ref.as_deref().map(str::trim).filter(|agent| !agent.is_empty())
    }

    pub fn render_error_message(&self, message: &str) -> String {
        self.error_message.replace(ERROR_MESSAGE_PLACEHOLDER, message)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use super::AssistantConfig;

    #[test]
    fn error_template_substitutes_every_placeholder() {
        let assistant = AssistantConfig::new("helper", "Helper")
            .with_error_message("Failed: [error_message] ([error_message])");

        assert_eq!(assistant.render_error_message("boom"), "Failed: boom (boom)");
    }

    #[test]
    fn template_without_placeholder_is_returned_verbatim() {
        let assistant =
            AssistantConfig::new("helper", "Helper").with_error_message("Please try later.");

        assert_eq!(assistant.render_error_message("boom"), "Please try later.");
    }

    #[test]
    fn missing_action_settings_default_to_empty() {
        let mut settings = Map::new();
        settings.insert("from".to_string(), json!("a@b.com"));
        let assistant = AssistantConfig::new("helper", "Helper").with_action("emailer", settings);

        assert_eq!(assistant.action_settings("emailer").get("from"), Some(&json!("a@b.com")));
        assert!(assistant.action_settings("unknown").is_empty());
    }

    #[test]
    fn blank_agent_reference_is_ignored() {
        let assistant = AssistantConfig::new("helper", "Helper").with_agent("  ");
        assert_eq!(assistant.agent(), None);

        let assistant = AssistantConfig::new("helper", "Helper").with_agent("planner");
        assert_eq!(assistant.agent(), Some("planner"));
    }
}
