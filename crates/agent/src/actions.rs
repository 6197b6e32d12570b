//! Action records produced by the model and the plugins that carry them out.
//!
//! Model output is untrusted. [`parse_action_record`] is the single place
//! where a raw entry is accepted or dropped; everything downstream works on
//! a validated [`ActionRecord`].

use std::collections::HashMap;

use async_trait::async_trait;
use quill_core::{ActionSettings, AssistantConfig, AssistantId, ChatMessage, ThreadId};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::provider::ProviderInstance;

pub const ASSISTANT_TAG_KEY: &str = "ai_assistant_api";
pub const THREAD_TAG_KEY: &str = "thread_id";

#[derive(Clone, Debug, PartialEq)]
pub struct ActionRecord {
    plugin: String,
    action: String,
    fields: Map<String, Value>,
}

impl ActionRecord {
    pub fn plugin(&self) -> &str {
        &self.plugin
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    /// The whole record as received, including `plugin` and `action`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Tags the record with the assistant and thread it was dispatched for.
    pub fn stamp(&mut self, assistant_id: &AssistantId, thread_id: &ThreadId) {
        self.fields.insert(ASSISTANT_TAG_KEY.to_string(), Value::String(assistant_id.0.clone()));
        self.fields.insert(THREAD_TAG_KEY.to_string(), Value::String(thread_id.0.clone()));
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformedAction {
    NotAnObject,
    MissingPlugin,
    MissingAction,
}

impl MalformedAction {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotAnObject => "entry is not an object",
            Self::MissingPlugin => "entry has no non-empty `plugin`",
            Self::MissingAction => "entry has no non-empty `action`",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ParsedAction {
    Valid(ActionRecord),
    Malformed(MalformedAction),
}

pub fn parse_action_record(raw: &Value) -> ParsedAction {
    let Some(fields) = raw.as_object() else {
        return ParsedAction::Malformed(MalformedAction::NotAnObject);
    };
    let Some(plugin) = non_empty_str(fields.get("plugin")) else {
        return ParsedAction::Malformed(MalformedAction::MissingPlugin);
    };
    let Some(action) = non_empty_str(fields.get("action")) else {
        return ParsedAction::Malformed(MalformedAction::MissingAction);
    };

    ParsedAction::Valid(ActionRecord {
        plugin: plugin.to_string(),
        action: action.to_string(),
        fields: fields.clone(),
    })
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|value| !value.is_empty())
}

/// The `actions` member of a structured reply, parsed entry by entry.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionBatch {
    entries: Vec<ParsedAction>,
}

impl ActionBatch {
    /// Anything other than an object with an `actions` array yields an empty batch.
    pub fn from_payload(payload: &Value) -> Self {
        let entries = payload
            .as_object()
            .and_then(|object| object.get("actions"))
            .and_then(Value::as_array)
            .map(|actions| actions.iter().map(parse_action_record).collect())
            .unwrap_or_default();

        Self { entries }
    }

    pub fn entries(&self) -> &[ParsedAction] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|entry| matches!(entry, ParsedAction::Malformed(_))).count()
    }

    /// Valid records in their original order.
    pub fn into_valid(self) -> Vec<ActionRecord> {
        self.entries
            .into_iter()
            .filter_map(|entry| match entry {
                ParsedAction::Valid(record) => Some(record),
                ParsedAction::Malformed(_) => None,
            })
            .collect()
    }
}

/// Everything an action instance is bound to before it is triggered.
#[derive(Clone, Debug)]
pub struct ActionContext {
    pub assistant: AssistantConfig,
    pub thread_id: ThreadId,
    pub provider: ProviderInstance,
    pub messages: Vec<ChatMessage>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActionOutput {
    pub structured: Option<Value>,
    pub context: Option<String>,
}

impl ActionOutput {
    pub fn structured(value: Value) -> Self {
        Self { structured: Some(value), context: None }
    }

    pub fn context(text: impl Into<String>) -> Self {
        Self { structured: None, context: Some(text.into()) }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("action plugin `{0}` does not exist")]
    UnknownPlugin(String),
    #[error("action plugin `{plugin}` could not be created: {message}")]
    Setup { plugin: String, message: String },
    #[error("{0}")]
    Failed(String),
}

impl ActionError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

#[async_trait]
pub trait ActionPlugin: Send {
    fn configure(&mut self, context: ActionContext);

    async fn trigger(
        &mut self,
        action: &str,
        record: &ActionRecord,
    ) -> Result<ActionOutput, ActionError>;

    /// Compensates the effect of the last trigger.
    async fn rollback(&mut self) -> Result<(), ActionError>;
}

type ActionFactory =
    Box<dyn Fn(&ActionSettings) -> Result<Box<dyn ActionPlugin>, ActionError> + Send + Sync>;

#[derive(Default)]
pub struct ActionRegistry {
    factories: HashMap<String, ActionFactory>,
}

impl ActionRegistry {
    pub fn register<F>(&mut self, plugin_id: impl Into<String>, factory: F)
    where
        F: Fn(&ActionSettings) -> Result<Box<dyn ActionPlugin>, ActionError>
            + Send
            + Sync
            + 'static,
    {
        self.factories.insert(plugin_id.into(), Box::new(factory));
    }

    pub fn create(
        &self,
        plugin_id: &str,
        settings: &ActionSettings,
    ) -> Result<Box<dyn ActionPlugin>, ActionError> {
        let factory = self
            .factories
            .get(plugin_id)
            .ok_or_else(|| ActionError::UnknownPlugin(plugin_id.to_string()))?;
        factory(settings)
    }

    pub fn contains(&self, plugin_id: &str) -> bool {
        self.factories.contains_key(plugin_id)
    }

    pub fn plugin_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
