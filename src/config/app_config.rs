use serde::Deserialize;

use crate::domain::{DomainError, SemanticCacheConfig};
use crate::infrastructure::embedding::EmbeddingConfig;
use crate::infrastructure::llm::ModelEndpointConfig;
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::services::RouterConfig;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub semantic_cache: SemanticCacheConfig,
    /// Required for the semantic cache; without it the cache is bypassed
    #[serde(default)]
    pub embedding: Option<EmbeddingConfig>,
    #[serde(default)]
    pub models: Vec<ModelEndpointConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allow cross-origin requests from any origin
    #[serde(default)]
    pub cors: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Admin API settings. The admin endpoints are disabled unless the named
/// variable is set.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    #[serde(default = "default_admin_key_env")]
    pub api_key_env: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_level() -> String {
    "info".to_string()
}

fn default_admin_key_env() -> String {
    "ROUTER_ADMIN_KEY".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_admin_key_env(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject settings the router cannot start with
    pub fn validate(&self) -> Result<(), DomainError> {
        self.router.validate()?;
        self.observability.validate()?;

        if self.semantic_cache.enabled {
            self.semantic_cache.validate()?;
        }

        if self.models.is_empty() {
            return Err(DomainError::configuration(
                "At least one model must be configured under [[models]]",
            ));
        }

        Ok(())
    }

    /// The cache runs only when enabled and an embedding endpoint exists
    pub fn cache_active(&self) -> bool {
        self.semantic_cache.enabled && self.embedding.is_some()
    }
}
