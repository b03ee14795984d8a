//! Embedding provider implementations

mod openai;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

pub use openai::OpenAiEmbeddingProvider;

pub use super::llm::{HttpClient, HttpClientTrait};

use super::llm::resolve_api_key;
use crate::domain::{DomainError, EmbeddingProvider};

/// Embedding endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of an OpenAI-compatible API; defaults to api.openai.com
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub dimensions: Option<usize>,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    5
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key_env: None,
            model: default_model(),
            dimensions: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

/// Build the configured embedding provider
pub fn create_embedding_provider(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingProvider>, DomainError> {
    let api_key = resolve_api_key(config.api_key_env.as_deref())?;
    let client = HttpClient::new("embedding", Duration::from_secs(config.connect_timeout_secs))?;

    let mut provider = match config.base_url {
        Some(ref base_url) => {
            OpenAiEmbeddingProvider::with_base_url(client, api_key, config.model.clone(), base_url)
        }
        None => OpenAiEmbeddingProvider::new(client, api_key, config.model.clone()),
    };

    if let Some(dimensions) = config.dimensions {
        provider = provider.with_dimensions(dimensions);
    }

    Ok(Arc::new(provider))
}
