//! Redis-backed semantic store
//!
//! Entries are JSON documents under `{namespace}:entry:{id}` with native
//! expiry. Similarity search scans the namespace and scores client-side.
//! Per-entry hit counts live in the `{namespace}:hits` hash so a hit never
//! rewrites the entry document.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

use crate::domain::embedding::cosine_similarity;
use crate::domain::semantic_cache::{
    CachedEntry, SemanticCacheStats, SemanticSearchResult, SemanticStore,
};
use crate::domain::DomainError;

const SCAN_BATCH: usize = 200;

/// Redis semantic store
#[derive(Clone)]
pub struct RedisSemanticStore {
    connection: ConnectionManager,
    namespace: String,
}

impl fmt::Debug for RedisSemanticStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisSemanticStore")
            .field("namespace", &self.namespace)
            .field("connection", &"<ConnectionManager>")
            .finish()
    }
}

fn unavailable(context: &str, error: redis::RedisError) -> DomainError {
    DomainError::store_unavailable(format!("{}: {}", context, error))
}

impl RedisSemanticStore {
    pub async fn connect(url: &str, namespace: impl Into<String>) -> Result<Self, DomainError> {
        let client = Client::open(url)
            .map_err(|e| unavailable("Failed to create Redis client", e))?;

        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| unavailable("Failed to connect to Redis", e))?;

        Ok(Self {
            connection,
            namespace: namespace.into(),
        })
    }

    fn entry_key(&self, id: &str) -> String {
        format!("{}:entry:{}", self.namespace, id)
    }

    fn entry_pattern(&self) -> String {
        format!("{}:entry:*", self.namespace)
    }

    fn stats_key(&self) -> String {
        format!("{}:stats", self.namespace)
    }

    fn hits_key(&self) -> String {
        format!("{}:hits", self.namespace)
    }

    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, DomainError> {
        let mut conn = self.connection.clone();
        let mut cursor = 0u64;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| unavailable("Failed to scan cache keys", e))?;

            keys.extend(batch);
            cursor = next;

            if cursor == 0 {
                break;
            }
        }

        Ok(keys)
    }

    async fn load_entries(&self) -> Result<Vec<CachedEntry>, DomainError> {
        let keys = self.scan_keys(&self.entry_pattern()).await?;
        let mut entries = Vec::with_capacity(keys.len());
        let mut conn = self.connection.clone();

        for batch in keys.chunks(SCAN_BATCH) {
            let values: Vec<Option<String>> = redis::cmd("MGET")
                .arg(batch)
                .query_async(&mut conn)
                .await
                .map_err(|e| unavailable("Failed to read cache entries", e))?;

            // Keys may expire between SCAN and MGET; unreadable documents are skipped
            entries.extend(
                values
                    .into_iter()
                    .flatten()
                    .filter_map(|raw| serde_json::from_str::<CachedEntry>(&raw).ok()),
            );
        }

        Ok(entries)
    }

    async fn write_entry(&self, entry: &CachedEntry, ttl: Duration) -> Result<(), DomainError> {
        let json = serde_json::to_string(entry)
            .map_err(|e| DomainError::internal(format!("Failed to serialize entry: {}", e)))?;
        let mut conn = self.connection.clone();

        let _: () = redis::pipe()
            .set_ex(self.entry_key(entry.id()), json, ttl.as_secs().max(1))
            .ignore()
            .hdel(self.hits_key(), entry.id())
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| unavailable("Failed to write cache entry", e))?;

        Ok(())
    }
}

#[async_trait]
impl SemanticStore for RedisSemanticStore {
    async fn search(
        &self,
        embedding: &[f32],
        min_similarity: f32,
        limit: usize,
    ) -> Result<Vec<SemanticSearchResult>, DomainError> {
        let mut results: Vec<SemanticSearchResult> = self
            .load_entries()
            .await?
            .into_iter()
            .filter(|entry| !entry.is_expired())
            .map(|entry| {
                let similarity = cosine_similarity(embedding, entry.embedding());
                SemanticSearchResult::new(entry, similarity)
            })
            .filter(|result| result.similarity >= min_similarity)
            .collect();

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(limit);

        Ok(results)
    }

    async fn upsert(&self, entry: CachedEntry) -> Result<(), DomainError> {
        let ttl = entry.remaining_ttl();
        if ttl.is_zero() {
            return Ok(());
        }
        self.write_entry(&entry, ttl).await
    }

    async fn get(&self, id: &str) -> Result<Option<CachedEntry>, DomainError> {
        let mut conn = self.connection.clone();

        let (raw, hits): (Option<String>, Option<u64>) = redis::pipe()
            .get(self.entry_key(id))
            .hget(self.hits_key(), id)
            .query_async(&mut conn)
            .await
            .map_err(|e| unavailable("Failed to read cache entry", e))?;

        Ok(raw
            .and_then(|raw| serde_json::from_str::<CachedEntry>(&raw).ok())
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.with_hit_count(hits.unwrap_or(0))))
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let mut conn = self.connection.clone();

        let (deleted,): (i64,) = redis::pipe()
            .del(self.entry_key(id))
            .hdel(self.hits_key(), id)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| unavailable("Failed to delete cache entry", e))?;

        Ok(deleted > 0)
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut keys = self.scan_keys(&self.entry_pattern()).await?;
        keys.push(self.stats_key());
        keys.push(self.hits_key());
        let mut conn = self.connection.clone();

        for batch in keys.chunks(SCAN_BATCH) {
            let _: i64 = conn
                .del(batch)
                .await
                .map_err(|e| unavailable("Failed to delete cache entries", e))?;
        }

        Ok(())
    }

    async fn size(&self) -> Result<usize, DomainError> {
        Ok(self.scan_keys(&self.entry_pattern()).await?.len())
    }

    async fn stats(&self) -> Result<SemanticCacheStats, DomainError> {
        let total_entries = self.size().await?;
        let mut conn = self.connection.clone();

        let (hits, misses, similarity_sum): (Option<u64>, Option<u64>, Option<f64>) = redis::pipe()
            .hget(self.stats_key(), "hits")
            .hget(self.stats_key(), "misses")
            .hget(self.stats_key(), "similarity_sum")
            .query_async(&mut conn)
            .await
            .map_err(|e| unavailable("Failed to read cache stats", e))?;

        let hits = hits.unwrap_or(0);
        let avg_hit_similarity = match (hits, similarity_sum) {
            (0, _) | (_, None) => 0.0,
            (hits, Some(sum)) => (sum / hits as f64) as f32,
        };

        Ok(SemanticCacheStats {
            total_entries,
            hits,
            misses: misses.unwrap_or(0),
            evictions: 0,
            avg_hit_similarity,
        })
    }

    async fn record_hit(&self, id: &str, similarity: f32) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let _: () = redis::pipe()
            .hincr(self.stats_key(), "hits", 1)
            .ignore()
            .hincr(self.stats_key(), "similarity_sum", similarity as f64)
            .ignore()
            .hincr(self.hits_key(), id, 1)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| unavailable("Failed to record cache hit", e))?;

        Ok(())
    }

    async fn record_miss(&self) -> Result<(), DomainError> {
        let mut conn = self.connection.clone();

        let _: i64 = conn
            .hincr(self.stats_key(), "misses", 1)
            .await
            .map_err(|e| unavailable("Failed to record cache miss", e))?;

        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, DomainError> {
        // Redis expires keys natively
        Ok(0)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
