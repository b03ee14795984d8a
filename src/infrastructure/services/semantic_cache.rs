//! Semantic response cache
//!
//! Answers repeated or paraphrased queries by embedding similarity. The
//! backing store is injected so the same service runs over the in-memory and
//! Redis stores.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::semantic_cache::{
    CachedEntry, SemanticCacheConfig, SemanticCacheStats, SemanticStore,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_cache_clear, record_cache_size};

/// A cached answer close enough to the probe embedding
#[derive(Debug, Clone)]
pub struct CacheHit {
    pub entry: CachedEntry,
    pub similarity: f32,
}

/// Embedding-indexed cache of prior (query, response) pairs
#[derive(Debug, Clone)]
pub struct SemanticCache {
    store: Arc<dyn SemanticStore>,
    config: SemanticCacheConfig,
}

impl SemanticCache {
    pub fn new(store: Arc<dyn SemanticStore>, config: SemanticCacheConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SemanticCacheConfig {
        &self.config
    }

    /// Similarity threshold from configuration
    pub fn threshold(&self) -> f32 {
        self.config.similarity_threshold
    }

    /// Default time-to-live for new entries
    pub fn ttl(&self) -> Duration {
        self.config.ttl()
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Insert or replace the entry keyed by `embedding`
    pub async fn put(
        &self,
        query: &str,
        embedding: Vec<f32>,
        response: &str,
        model_id: &str,
        ttl: Duration,
    ) -> Result<(), DomainError> {
        if embedding.is_empty() {
            return Err(DomainError::validation("Cannot cache an empty embedding"));
        }

        let entry = CachedEntry::new(embedding, query, response, model_id, ttl);
        let id = entry.id().to_string();

        self.store.upsert(entry).await?;

        debug!(entry_id = %id, model = %model_id, "Cached response");
        Ok(())
    }

    /// Nearest non-expired entry with similarity `>= threshold`
    pub async fn lookup(
        &self,
        embedding: &[f32],
        threshold: f32,
    ) -> Result<Option<CacheHit>, DomainError> {
        let best = self
            .store
            .search(embedding, threshold, 1)
            .await?
            .into_iter()
            .next();

        match best {
            Some(result) => {
                debug!(
                    entry_id = %result.entry.id(),
                    similarity = result.similarity,
                    "Semantic cache hit"
                );

                if let Err(e) = self.store.record_hit(result.entry.id(), result.similarity).await {
                    debug!(error = %e, "Failed to record cache hit");
                }

                let mut entry = result.entry;
                entry.increment_hits();

                Ok(Some(CacheHit {
                    entry,
                    similarity: result.similarity,
                }))
            }
            None => {
                if let Err(e) = self.store.record_miss().await {
                    debug!(error = %e, "Failed to record cache miss");
                }
                Ok(None)
            }
        }
    }

    /// Approximate number of entries
    pub async fn size(&self) -> Result<usize, DomainError> {
        self.store.size().await
    }

    /// Remove every entry, returning the count observed just before.
    ///
    /// Best-effort: entries written concurrently between the count and the
    /// reset may be removed without being counted, or survive it.
    pub async fn clear(&self) -> Result<usize, DomainError> {
        let count = self.store.size().await?;
        self.store.clear().await?;

        record_cache_clear(count);
        record_cache_size(0);
        info!(count, backend = self.backend_name(), "Semantic cache cleared");

        Ok(count)
    }

    pub async fn stats(&self) -> Result<SemanticCacheStats, DomainError> {
        let stats = self.store.stats().await?;
        record_cache_size(stats.total_entries);
        Ok(stats)
    }

    /// Drop expired entries, returning how many were removed
    pub async fn purge_expired(&self) -> Result<usize, DomainError> {
        let removed = self.store.cleanup_expired().await?;

        if removed > 0 {
            info!(removed, "Purged expired semantic cache entries");
        }

        Ok(removed)
    }

    /// Periodically purge expired entries until the task is aborted
    pub fn spawn_purge_task(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = cache.purge_expired().await {
                    warn!(error = %e, "Semantic cache purge failed");
                }
            }
        })
    }
}
