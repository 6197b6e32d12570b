use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use quill_core::config::LlmConfig;
use quill_core::AssistantConfig;
use thiserror::Error;

use crate::llm::LlmClient;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderModel {
    pub provider_id: String,
    pub model: String,
}

/// A freshly created client for one provider/model pair.
#[derive(Clone)]
pub struct ProviderInstance {
    pub provider: ProviderModel,
    pub client: Arc<dyn LlmClient>,
}

impl fmt::Debug for ProviderInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderInstance").field("provider", &self.provider).finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("no provider/model configured for assistant `{0}`")]
    Unresolved(String),
    #[error("provider `{0}` is not registered")]
    UnknownProvider(String),
    #[error("provider `{provider_id}` could not be created: {source}")]
    Instantiate {
        provider_id: String,
        #[source]
        source: anyhow::Error,
    },
}

pub trait ProviderResolver: Send + Sync {
    fn resolve(&self, assistant: &AssistantConfig) -> Result<ProviderModel, ProviderError>;
    fn instantiate(&self, provider: &ProviderModel) -> Result<ProviderInstance, ProviderError>;
}

type ProviderFactory =
    Box<dyn Fn(&ProviderModel) -> anyhow::Result<Arc<dyn LlmClient>> + Send + Sync>;

/// Provider factories keyed by provider id, with deployment-wide defaults.
pub struct ProviderRegistry {
    default_provider: String,
    default_model: String,
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    pub fn new(default_provider: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self {
            default_provider: default_provider.into(),
            default_model: default_model.into(),
            factories: HashMap::new(),
        }
    }

    pub fn from_config(llm: &LlmConfig) -> Self {
        Self::new(llm.provider.as_str(), llm.model.clone())
    }

    pub fn register<F>(&mut self, provider_id: impl Into<String>, factory: F)
    where
        F: Fn(&ProviderModel) -> anyhow::Result<Arc<dyn LlmClient>> + Send + Sync + 'static,
    {
        self.factories.insert(provider_id.into(), Box::new(factory));
    }

    pub fn contains(&self, provider_id: &str) -> bool {
        self.factories.contains_key(provider_id)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl ProviderResolver for ProviderRegistry {
    fn resolve(&self, assistant: &AssistantConfig) -> Result<ProviderModel, ProviderError> {
        let provider_id = non_empty(assistant.llm_provider.as_deref())
            .or_else(|| non_empty(Some(&self.default_provider)))
            .ok_or_else(|| ProviderError::Unresolved(assistant.id.to_string()))?;
        let model = non_empty(assistant.llm_model.as_deref())
            .or_else(|| non_empty(Some(&self.default_model)))
            .ok_or_else(|| ProviderError::Unresolved(assistant.id.to_string()))?;

        Ok(ProviderModel { provider_id: provider_id.to_string(), model: model.to_string() })
    }

    fn instantiate(&self, provider: &ProviderModel) -> Result<ProviderInstance, ProviderError> {
        let factory = self
            .factories
            .get(&provider.provider_id)
            .ok_or_else(|| ProviderError::UnknownProvider(provider.provider_id.clone()))?;
        let client = factory(provider).map_err(|source| ProviderError::Instantiate {
            provider_id: provider.provider_id.clone(),
            source,
        })?;

        Ok(ProviderInstance { provider: provider.clone(), client })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use quill_core::AssistantConfig;

    use super::{ProviderError, ProviderRegistry, ProviderResolver};
    use crate::llm::LlmClient;

    struct EchoClient;

    #[async_trait]
    impl LlmClient for EchoClient {
        async fn complete(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_string())
        }
    }

    #[test]
    fn assistant_overrides_win_over_defaults() {
        let registry = ProviderRegistry::new("ollama", "llama3.1");
        let mut assistant = AssistantConfig::new("helper", "Helper");
        assistant.llm_model = Some("qwen2".to_string());

        let resolved = registry.resolve(&assistant).expect("provider should resolve");
        assert_eq!(resolved.provider_id, "ollama");
        assert_eq!(resolved.model, "qwen2");
    }

    #[test]
    fn blank_defaults_leave_provider_unresolved() {
        let registry = ProviderRegistry::new("", "");
        let error = registry
            .resolve(&AssistantConfig::new("helper", "Helper"))
            .expect_err("nothing to resolve");
        assert!(matches!(error, ProviderError::Unresolved(ref id) if id == "helper"));
    }

    #[test]
    fn instantiate_uses_registered_factory() {
        let mut registry = ProviderRegistry::new("ollama", "llama3.1");
        registry.register("ollama", |_| Ok(Arc::new(EchoClient) as Arc<dyn LlmClient>));
        registry.register("broken", |_| Err(anyhow!("missing credentials")));
        assert_eq!(registry.len(), 2);

        let provider = registry
            .resolve(&AssistantConfig::new("helper", "Helper"))
            .expect("provider should resolve");
        let instance = registry.instantiate(&provider).expect("factory is registered");
        assert_eq!(instance.provider, provider);

        let mut broken = provider.clone();
        broken.provider_id = "broken".to_string();
        let error = registry.instantiate(&broken).expect_err("factory fails");
        assert!(error.to_string().contains("missing credentials"));

        broken.provider_id = "openai".to_string();
        let error = registry.instantiate(&broken).expect_err("factory missing");
        assert!(matches!(error, ProviderError::UnknownProvider(ref id) if id == "openai"));
    }
}
