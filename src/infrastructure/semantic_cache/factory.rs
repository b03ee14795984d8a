//! Store selection from configuration

use std::sync::Arc;

use tracing::info;

use super::{InMemorySemanticStore, RedisSemanticStore};
use crate::domain::semantic_cache::{CacheBackend, SemanticCacheConfig, SemanticStore};
use crate::domain::DomainError;

/// Build the configured store
pub async fn create_semantic_store(
    config: &SemanticCacheConfig,
) -> Result<Arc<dyn SemanticStore>, DomainError> {
    config.validate()?;

    let store: Arc<dyn SemanticStore> = match config.backend {
        CacheBackend::Memory => Arc::new(InMemorySemanticStore::new(config.max_entries)),
        CacheBackend::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                DomainError::configuration("semantic_cache.redis_url is required")
            })?;
            Arc::new(RedisSemanticStore::connect(url, config.namespace.clone()).await?)
        }
    };

    info!(
        backend = store.backend_name(),
        namespace = %config.namespace,
        threshold = config.similarity_threshold,
        "Semantic cache store ready"
    );

    Ok(store)
}
