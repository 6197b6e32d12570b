use std::env;
use std::fs;
use std::path::Path;

use quill_core::config::{resolve_config_path, AppConfig, LoadOptions, LogFormat};
use toml::Value;

pub fn run_with(options: &LoadOptions) -> String {
    let config = match AppConfig::load(options.clone()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let sources = SourceLookup {
        doc: config_file_path.as_deref().and_then(load_config_file_doc),
        path: config_file_path.as_deref(),
    };

    let fields: [(&str, String, Option<&str>); 12] = [
        (
            "assistant.custom_prompts",
            config.assistant.custom_prompts.to_string(),
            Some("QUILL_ASSISTANT_CUSTOM_PROMPTS"),
        ),
        (
            "assistant.prompt_path",
            config.assistant.prompt_path.display().to_string(),
            Some("QUILL_ASSISTANT_PROMPT_PATH"),
        ),
        ("assistant.verbose", config.assistant.verbose.to_string(), Some("QUILL_ASSISTANT_VERBOSE")),
        (
            "assistant.log_channel",
            config.assistant.log_channel.clone(),
            Some("QUILL_ASSISTANT_LOG_CHANNEL"),
        ),
        ("llm.provider", config.llm.provider.as_str().to_string(), Some("QUILL_LLM_PROVIDER")),
        ("llm.model", config.llm.model.clone(), Some("QUILL_LLM_MODEL")),
        (
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            Some("QUILL_LLM_BASE_URL"),
        ),
        (
            "llm.api_key",
            if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" }.to_string(),
            Some("QUILL_LLM_API_KEY"),
        ),
        ("llm.timeout_secs", config.llm.timeout_secs.to_string(), Some("QUILL_LLM_TIMEOUT_SECS")),
        ("llm.max_retries", config.llm.max_retries.to_string(), Some("QUILL_LLM_MAX_RETRIES")),
        ("logging.level", config.logging.level.clone(), Some("QUILL_LOGGING_LEVEL")),
        ("logging.format", format_name(config.logging.format).to_string(), Some("QUILL_LOGGING_FORMAT")),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_key) in &fields {
        lines.push(render_line(key, value, sources.field_source(key, *env_key)));
    }

    let assistant_ids: Vec<&str> = config.assistants.keys().map(String::as_str).collect();
    let assistants = if assistant_ids.is_empty() {
        "<none>".to_string()
    } else {
        assistant_ids.join(", ")
    };
    lines.push(render_line("assistants", &assistants, sources.field_source("assistants", None)));

    lines.join("\n")
}

struct SourceLookup<'a> {
    doc: Option<Value>,
    path: Option<&'a Path>,
}

impl SourceLookup<'_> {
    fn field_source(&self, key_path: &str, env_key: Option<&str>) -> String {
        if let Some(env_key) = env_key {
            if env::var_os(env_key).is_some() {
                return format!("env ({env_key})");
            }
        }

        if let Some(doc) = &self.doc {
            if contains_path(doc, key_path) {
                let file_path = self
                    .path
                    .map(|path| path.display().to_string())
                    .unwrap_or_else(|| "config file".to_string());
                return format!("file ({file_path})");
            }
        }

        "default".to_string()
    }
}

fn load_config_file_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn format_name(format: LogFormat) -> &'static str {
    match format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    }
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
