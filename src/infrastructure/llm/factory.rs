use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use super::http_client::HttpClient;
use super::OpenAiAdapter;
use crate::domain::{
    ComplexityTier, DomainError, LatencyClass, ModelAdapter, ModelProfile, ModelRegistry,
};

/// One backend model entry from configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelEndpointConfig {
    pub provider: String,
    pub model: String,
    /// Base URL of an OpenAI-compatible API; defaults to api.openai.com
    #[serde(default)]
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_cost")]
    pub cost: f64,
    #[serde(default)]
    pub latency_class: LatencyClass,
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,
    pub min_tier: ComplexityTier,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_cost() -> f64 {
    1.0
}

fn default_max_context_tokens() -> usize {
    8192
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl ModelEndpointConfig {
    pub fn profile(&self) -> ModelProfile {
        ModelProfile::new(self.provider.clone(), self.model.clone(), self.min_tier)
            .with_cost(self.cost)
            .with_latency_class(self.latency_class)
            .with_max_context_tokens(self.max_context_tokens)
    }
}

/// Read an API key from the environment variable named in configuration.
///
/// A configured but unset variable is an error so a missing secret surfaces
/// at startup instead of as upstream 401s.
pub fn resolve_api_key(api_key_env: Option<&str>) -> Result<Option<String>, DomainError> {
    let Some(var) = api_key_env else {
        return Ok(None);
    };

    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
        _ => Err(DomainError::configuration(format!(
            "Environment variable '{}' is not set",
            var
        ))),
    }
}

/// Factory for creating model adapters
#[derive(Debug)]
pub struct ModelAdapterFactory;

impl ModelAdapterFactory {
    pub fn create(config: &ModelEndpointConfig) -> Result<Arc<dyn ModelAdapter>, DomainError> {
        let profile = config.profile();
        profile.validate()?;

        let api_key = resolve_api_key(config.api_key_env.as_deref())?;
        let client = HttpClient::new(
            config.provider.clone(),
            Duration::from_secs(config.connect_timeout_secs),
        )?;

        let adapter = match config.base_url {
            Some(ref base_url) => OpenAiAdapter::with_base_url(client, profile, api_key, base_url),
            None => OpenAiAdapter::new(client, profile, api_key),
        };

        Ok(Arc::new(adapter))
    }

    /// Build the registry for every configured model
    pub fn build_registry(configs: &[ModelEndpointConfig]) -> Result<ModelRegistry, DomainError> {
        let adapters = configs
            .iter()
            .map(Self::create)
            .collect::<Result<Vec<_>, _>>()?;

        let registry = ModelRegistry::new(adapters)?;

        for tier in registry.uncovered_tiers() {
            warn!(tier = %tier, "No configured model can serve this tier");
        }

        info!(models = registry.len(), "Model registry loaded");

        Ok(registry)
    }
}
