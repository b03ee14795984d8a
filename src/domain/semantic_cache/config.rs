//! Semantic cache configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// Storage backend behind the semantic cache
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Memory,
    Redis,
}

/// Configuration for semantic caching
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticCacheConfig {
    /// Whether semantic caching is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub backend: CacheBackend,

    /// Connection URL, required for the Redis backend
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Minimum cosine similarity for a hit (0.0 to 1.0)
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Maximum number of entries kept by the in-memory backend
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Time-to-live for cached entries in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Key prefix for cache entries
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

fn default_enabled() -> bool {
    true
}

fn default_similarity_threshold() -> f32 {
    0.92
}

fn default_max_entries() -> usize {
    10_000
}

fn default_ttl_secs() -> u64 {
    86_400
}

fn default_namespace() -> String {
    "router:semantic".to_string()
}

impl Default for SemanticCacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            backend: CacheBackend::default(),
            redis_url: None,
            similarity_threshold: default_similarity_threshold(),
            max_entries: default_max_entries(),
            ttl_secs: default_ttl_secs(),
            namespace: default_namespace(),
        }
    }
}

impl SemanticCacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_backend(mut self, backend: CacheBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_redis_url(mut self, url: impl Into<String>) -> Self {
        self.redis_url = Some(url.into());
        self
    }

    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl_secs = ttl.as_secs();
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(DomainError::configuration(format!(
                "semantic_cache.similarity_threshold must be within [0, 1], got {}",
                self.similarity_threshold
            )));
        }

        if self.max_entries == 0 {
            return Err(DomainError::configuration(
                "semantic_cache.max_entries must be greater than zero",
            ));
        }

        if self.namespace.trim().is_empty() {
            return Err(DomainError::configuration(
                "semantic_cache.namespace must not be empty",
            ));
        }

        if self.backend == CacheBackend::Redis && self.redis_url.is_none() {
            return Err(DomainError::configuration(
                "semantic_cache.redis_url is required for the redis backend",
            ));
        }

        Ok(())
    }
}
