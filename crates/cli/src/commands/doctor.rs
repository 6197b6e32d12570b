use quill_agent::prompt::{FilePromptSource, PromptSource};
use quill_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run_with(options: &LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_bundled_prompt(&config));
            checks.push(check_assistants(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["bundled_prompt", "assistants"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status != CheckStatus::Fail);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Without a readable, non-empty bundled prompt every turn skips action dispatch.
fn check_bundled_prompt(config: &AppConfig) -> DoctorCheck {
    if config.assistant.custom_prompts {
        return DoctorCheck {
            name: "bundled_prompt",
            status: CheckStatus::Skipped,
            details: "custom prompts enabled; assistants supply their own".to_string(),
        };
    }

    let source = FilePromptSource::new(config.assistant.prompt_path.clone());
    match source.read_bundled_prompt() {
        Ok(prompt) if prompt.is_empty() => DoctorCheck {
            name: "bundled_prompt",
            status: CheckStatus::Fail,
            details: format!("`{}` is empty; actions will never run", source.path().display()),
        },
        Ok(prompt) => DoctorCheck {
            name: "bundled_prompt",
            status: CheckStatus::Pass,
            details: format!("read {} bytes from `{}`", prompt.len(), source.path().display()),
        },
        Err(error) => {
            DoctorCheck { name: "bundled_prompt", status: CheckStatus::Fail, details: error.to_string() }
        }
    }
}

fn check_assistants(config: &AppConfig) -> DoctorCheck {
    if config.assistants.is_empty() {
        return DoctorCheck {
            name: "assistants",
            status: CheckStatus::Fail,
            details: "no assistants configured under [assistants.<id>]".to_string(),
        };
    }

    let summaries: Vec<String> = config
        .assistants
        .values()
        .map(|assistant| match assistant.agent() {
            Some(agent_ref) => format!("{} (agent `{agent_ref}`)", assistant.id),
            None => format!("{} ({} actions)", assistant.id, assistant.actions_enabled.len()),
        })
        .collect();

    DoctorCheck { name: "assistants", status: CheckStatus::Pass, details: summaries.join(", ") }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
