use std::fs;
use std::path::Path;

use quill_agent::actions::{ActionBatch, MalformedAction, ParsedAction};
use quill_core::config::{AppConfig, LoadOptions};
use serde::Serialize;
use serde_json::Value;

use super::CommandResult;

const COMMAND: &str = "actions";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum EntryStatus {
    Dispatch,
    Skipped,
}

#[derive(Debug, Serialize)]
struct EntryReport {
    index: usize,
    status: EntryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    plugin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<String>,
    /// Whether the assistant lists settings for the plugin.
    #[serde(skip_serializing_if = "Option::is_none")]
    configured: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<MalformedAction>,
}

#[derive(Debug, Serialize)]
struct DryRunReport {
    command: &'static str,
    status: &'static str,
    assistant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    delegates_to_agent: Option<String>,
    total: usize,
    dispatched: usize,
    skipped: usize,
    entries: Vec<EntryReport>,
}

/// Parses a structured reply the way a turn would and reports what would be
/// dispatched. No plugin is created or triggered.
pub fn run_with(options: &LoadOptions, assistant_id: &str, payload_path: &Path) -> CommandResult {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(COMMAND, "config_validation", error.to_string(), 2)
        }
    };

    let Some(assistant) = config.assistant(assistant_id) else {
        return CommandResult::failure(
            COMMAND,
            "unknown_assistant",
            format!("assistant `{assistant_id}` is not configured"),
            3,
        );
    };

    let payload = match read_payload(payload_path) {
        Ok(payload) => payload,
        Err(message) => return CommandResult::failure(COMMAND, "payload", message, 4),
    };

    let batch = ActionBatch::from_payload(&payload);
    let entries: Vec<EntryReport> = batch
        .entries()
        .iter()
        .enumerate()
        .map(|(index, entry)| match entry {
            ParsedAction::Valid(record) => EntryReport {
                index,
                status: EntryStatus::Dispatch,
                plugin: Some(record.plugin().to_string()),
                action: Some(record.action().to_string()),
                configured: Some(assistant.actions_enabled.contains_key(record.plugin())),
                reason: None,
            },
            ParsedAction::Malformed(reason) => EntryReport {
                index,
                status: EntryStatus::Skipped,
                plugin: None,
                action: None,
                configured: None,
                reason: Some(*reason),
            },
        })
        .collect();

    let report = DryRunReport {
        command: COMMAND,
        status: "ok",
        assistant: assistant.id.to_string(),
        delegates_to_agent: assistant.agent().map(str::to_string),
        total: batch.len(),
        dispatched: batch.len() - batch.skipped(),
        skipped: batch.skipped(),
        entries,
    };

    CommandResult::report(COMMAND, &report)
}

fn read_payload(path: &Path) -> Result<Value, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("could not read `{}`: {error}", path.display()))?;
    serde_json::from_str(&raw)
        .map_err(|error| format!("`{}` is not valid JSON: {error}", path.display()))
}
