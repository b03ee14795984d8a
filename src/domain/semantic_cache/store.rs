//! Backing store trait for the semantic cache

use std::fmt::Debug;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use super::{CachedEntry, SemanticCacheStats, SemanticSearchResult};
use crate::domain::DomainError;

/// Embedding-indexed storage of cached responses.
///
/// Implementations must be internally synchronized. Every method reports an
/// unreachable or misconfigured backend as [`DomainError::StoreUnavailable`].
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SemanticStore: Send + Sync + Debug {
    /// Non-expired entries with similarity `>= min_similarity`, best first
    async fn search(
        &self,
        embedding: &[f32],
        min_similarity: f32,
        limit: usize,
    ) -> Result<Vec<SemanticSearchResult>, DomainError>;

    /// Insert or replace the entry with the same id
    async fn upsert(&self, entry: CachedEntry) -> Result<(), DomainError>;

    async fn get(&self, id: &str) -> Result<Option<CachedEntry>, DomainError>;

    async fn delete(&self, id: &str) -> Result<bool, DomainError>;

    /// Remove every entry and reset counters
    async fn clear(&self) -> Result<(), DomainError>;

    /// Approximate number of entries
    async fn size(&self) -> Result<usize, DomainError>;

    async fn stats(&self) -> Result<SemanticCacheStats, DomainError>;

    async fn record_hit(&self, id: &str, similarity: f32) -> Result<(), DomainError>;

    async fn record_miss(&self) -> Result<(), DomainError>;

    /// Drop expired entries, returning how many were removed
    async fn cleanup_expired(&self) -> Result<usize, DomainError>;

    /// Backend name for logs and metrics
    fn backend_name(&self) -> &'static str;
}
