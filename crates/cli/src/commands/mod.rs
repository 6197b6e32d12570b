pub mod actions;
pub mod config;
pub mod doctor;

use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct FailureOutcome<'a> {
    command: &'a str,
    status: &'static str,
    error_class: &'a str,
    message: String,
}

impl CommandResult {
    /// Pretty-printed JSON report with exit code 0.
    pub fn report(command: &str, report: &impl Serialize) -> Self {
        match serde_json::to_string_pretty(report) {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let outcome =
            FailureOutcome { command, status: "error", error_class, message: message.into() };
        let output = serde_json::to_string(&outcome)
            .unwrap_or_else(|error| fallback_failure(command, &error.to_string()));
        Self { exit_code, output }
    }
}

/// Hand-built failure line for when the outcome itself cannot be serialized.
fn fallback_failure(command: &str, message: &str) -> String {
    format!(
        "{{\"command\":\"{}\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
        escape_json(command),
        escape_json(message)
    )
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
