use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::assistant::{ActionSettings, AssistantConfig};
use crate::validation::{AssistantValidator, StructuralValidator};

pub const DEFAULT_PROMPT_PATH: &str = "resources/system_prompt.txt";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub assistant: AssistantRuntimeConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
    pub assistants: BTreeMap<String, AssistantConfig>,
}

/// Deployment-wide settings shared by every assistant.
#[derive(Clone, Debug)]
pub struct AssistantRuntimeConfig {
    /// When false, the bundled prompt file always replaces per-assistant prompts.
    pub custom_prompts: bool,
    pub prompt_path: PathBuf,
    pub verbose: bool,
    pub log_channel: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
    Ollama,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub custom_prompts: Option<bool>,
    pub prompt_path: Option<PathBuf>,
    pub verbose: Option<bool>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            assistant: AssistantRuntimeConfig {
                custom_prompts: false,
                prompt_path: PathBuf::from(DEFAULT_PROMPT_PATH),
                verbose: false,
                log_channel: "ai_assistant_api".to_string(),
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
            assistants: BTreeMap::new(),
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("quill.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn assistant(&self, id: &str) -> Option<&AssistantConfig> {
        self.assistants.get(id)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(assistant) = patch.assistant {
            if let Some(custom_prompts) = assistant.custom_prompts {
                self.assistant.custom_prompts = custom_prompts;
            }
            if let Some(prompt_path) = assistant.prompt_path {
                self.assistant.prompt_path = prompt_path;
            }
            if let Some(verbose) = assistant.verbose {
                self.assistant.verbose = verbose;
            }
            if let Some(log_channel) = assistant.log_channel {
                self.assistant.log_channel = log_channel;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }

        for (id, definition) in patch.assistants {
            let assistant = definition.into_assistant(&id);
            self.assistants.insert(id, assistant);
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("QUILL_ASSISTANT_CUSTOM_PROMPTS") {
            self.assistant.custom_prompts = parse_bool("QUILL_ASSISTANT_CUSTOM_PROMPTS", &value)?;
        }
        if let Some(value) = read_env("QUILL_ASSISTANT_PROMPT_PATH") {
            self.assistant.prompt_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("QUILL_ASSISTANT_VERBOSE") {
            self.assistant.verbose = parse_bool("QUILL_ASSISTANT_VERBOSE", &value)?;
        }
        if let Some(value) = read_env("QUILL_ASSISTANT_LOG_CHANNEL") {
            self.assistant.log_channel = value;
        }

        if let Some(value) = read_env("QUILL_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("QUILL_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("QUILL_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("QUILL_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("QUILL_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("QUILL_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("QUILL_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("QUILL_LLM_MAX_RETRIES", &value)?;
        }

        let log_level = read_env("QUILL_LOGGING_LEVEL").or_else(|| read_env("QUILL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("QUILL_LOGGING_FORMAT").or_else(|| read_env("QUILL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(custom_prompts) = overrides.custom_prompts {
            self.assistant.custom_prompts = custom_prompts;
        }
        if let Some(prompt_path) = overrides.prompt_path {
            self.assistant.prompt_path = prompt_path;
        }
        if let Some(verbose) = overrides.verbose {
            self.assistant.verbose = verbose;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_assistant_runtime(&self.assistant)?;
        validate_llm(&self.llm)?;
        validate_logging(&self.logging)?;
        validate_assistants(&self.assistants)?;
        Ok(())
    }
}

/// The explicit path when it exists, otherwise the first default location found.
pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("quill.toml"), PathBuf::from("config/quill.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_assistant_runtime(assistant: &AssistantRuntimeConfig) -> Result<(), ConfigError> {
    if !assistant.custom_prompts && assistant.prompt_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "assistant.prompt_path is required when assistant.custom_prompts is false".to_string(),
        ));
    }

    if assistant.log_channel.trim().is_empty() {
        return Err(ConfigError::Validation(
            "assistant.log_channel must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.model.trim().is_empty() {
        return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
    }

    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_assistants(assistants: &BTreeMap<String, AssistantConfig>) -> Result<(), ConfigError> {
    for (id, assistant) in assistants {
        StructuralValidator
            .validate(assistant)
            .map_err(|error| ConfigError::Validation(format!("assistants.{id}: {error}")))?;
    }
    Ok(())
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    assistant: Option<AssistantRuntimePatch>,
    llm: Option<LlmPatch>,
    logging: Option<LoggingPatch>,
    #[serde(default)]
    assistants: BTreeMap<String, AssistantDefinition>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistantRuntimePatch {
    custom_prompts: Option<bool>,
    prompt_path: Option<PathBuf>,
    verbose: Option<bool>,
    log_channel: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[derive(Debug, Default, Deserialize)]
struct AssistantDefinition {
    label: Option<String>,
    agent_ref: Option<String>,
    system_prompt: Option<String>,
    error_message: Option<String>,
    #[serde(default)]
    actions_enabled: BTreeMap<String, ActionSettings>,
    #[serde(default)]
    throw_on_error: bool,
    llm_provider: Option<String>,
    llm_model: Option<String>,
}

impl AssistantDefinition {
    fn into_assistant(self, id: &str) -> AssistantConfig {
        let mut assistant = AssistantConfig::new(id, self.label.unwrap_or_else(|| id.to_string()));
        assistant.agent_ref = self.agent_ref;
        assistant.system_prompt = self.system_prompt;
        if let Some(error_message) = self.error_message {
            assistant.error_message = error_message;
        }
        assistant.actions_enabled = self.actions_enabled;
        assistant.throw_on_error = self.throw_on_error;
        assistant.llm_provider = self.llm_provider;
        assistant.llm_model = self.llm_model;
        assistant
    }
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use serde_json::json;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn write_config(dir: &TempDir, body: &str) -> Result<std::path::PathBuf, String> {
        let path = dir.path().join("quill.toml");
        fs::write(&path, body).map_err(|err| err.to_string())?;
        Ok(path)
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_QUILL_API_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[llm]
provider = "openai"
api_key = "${TEST_QUILL_API_KEY}"
model = "gpt-4o-mini"
"#,
            )?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.provider == LlmProvider::OpenAi, "provider should come from file")?;
            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "sk-from-env")
                    == Some(true),
                "api key should be interpolated from environment",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_QUILL_API_KEY"]);
        result
    }

    #[test]
    fn file_provider_names_match_env_names() -> Result<(), String> {
        for provider in [LlmProvider::OpenAi, LlmProvider::Anthropic, LlmProvider::Ollama] {
            let body = format!("provider = \"{}\"", provider.as_str());
            let patch = toml::from_str::<super::LlmPatch>(&body)
                .map_err(|err| format!("`{}` should parse from a file: {err}", provider.as_str()))?;
            ensure(patch.provider == Some(provider), "file spelling should match env spelling")?;

            let parsed = provider
                .as_str()
                .parse::<LlmProvider>()
                .map_err(|err| format!("`{}` should parse from env: {err}", provider.as_str()))?;
            ensure(parsed == provider, "env spelling should round back to the same provider")?;
        }
        Ok(())
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(&dir, "[llm]\nmodel = \"${TEST_QUILL_UNSET_MODEL}\"\n")?;

        match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
            Err(ConfigError::MissingEnvInterpolation { var }) => {
                ensure(var == "TEST_QUILL_UNSET_MODEL", "error should name the missing variable")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected interpolation failure".to_string()),
        }
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUILL_LOG_LEVEL", "warn");
        env::set_var("QUILL_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["QUILL_LOG_LEVEL", "QUILL_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUILL_LLM_MODEL", "model-from-env");
        env::set_var("QUILL_ASSISTANT_CUSTOM_PROMPTS", "true");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = write_config(
                &dir,
                r#"
[assistant]
custom_prompts = false
prompt_path = "prompts/from-file.txt"

[llm]
model = "model-from-file"

[logging]
level = "warn"
"#,
            )?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.llm.model == "model-from-env", "env model should win over file")?;
            ensure(config.assistant.custom_prompts, "env custom prompts flag should win over file")?;
            ensure(
                config.assistant.prompt_path.ends_with("prompts/from-file.txt"),
                "file prompt path should win over default",
            )?;
            ensure(config.assistant.log_channel == "ai_assistant_api", "default log channel")?;
            Ok(())
        })();

        clear_vars(&["QUILL_LLM_MODEL", "QUILL_ASSISTANT_CUSTOM_PROMPTS"]);
        result
    }

    #[test]
    fn assistants_are_loaded_from_file_tables() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(
            &dir,
            r#"
[assistants.markdown_designer]
label = "Markdown designer"
error_message = "Sorry: [error_message]"
throw_on_error = true

[assistants.markdown_designer.actions_enabled.emailer]
from = "a@b.com"
"#,
        )?;

        let config =
            AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                .map_err(|err| format!("config load failed: {err}"))?;
        let assistant =
            config.assistant("markdown_designer").ok_or("assistant should be defined")?;

        ensure(assistant.id.as_str() == "markdown_designer", "id comes from the table key")?;
        ensure(assistant.throw_on_error, "throw_on_error should be read")?;
        ensure(
            assistant.action_settings("emailer").get("from") == Some(&json!("a@b.com")),
            "action settings should be read",
        )?;
        ensure(assistant.render_error_message("x") == "Sorry: x", "template should be read")
    }

    #[test]
    fn invalid_assistant_definition_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = write_config(&dir, "[assistants.Bad-Id]\nlabel = \"Bad\"\n")?;

        match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
            Err(ConfigError::Validation(message)) => {
                ensure(message.contains("assistants.Bad-Id"), "message should name the assistant")
            }
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected validation failure".to_string()),
        }
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUILL_LLM_PROVIDER", "anthropic");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("llm.api_key")
            );
            ensure(has_message, "validation failure should mention llm.api_key")
        })();

        clear_vars(&["QUILL_LLM_PROVIDER"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("QUILL_LLM_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["QUILL_LLM_API_KEY"]);
        result
    }
}
