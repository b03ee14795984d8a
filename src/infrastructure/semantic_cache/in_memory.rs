//! In-memory semantic store

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::domain::embedding::cosine_similarity;
use crate::domain::semantic_cache::{
    CachedEntry, SemanticCacheStats, SemanticSearchResult, SemanticStore,
};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct SimilarityTotals {
    sum: f64,
    count: u64,
}

/// Bounded in-process store using linear search.
///
/// When full, expired entries are dropped first and then the oldest entry.
#[derive(Debug)]
pub struct InMemorySemanticStore {
    entries: RwLock<HashMap<String, CachedEntry>>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    similarity: RwLock<SimilarityTotals>,
}

impl InMemorySemanticStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            similarity: RwLock::new(SimilarityTotals::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, CachedEntry>>, DomainError> {
        self.entries
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, CachedEntry>>, DomainError> {
        self.entries
            .write()
            .map_err(|e| DomainError::internal(format!("Failed to acquire write lock: {}", e)))
    }

    fn make_room(&self, entries: &mut HashMap<String, CachedEntry>) {
        if entries.len() < self.max_entries {
            return;
        }

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let mut evicted = (before - entries.len()) as u64;

        if entries.len() >= self.max_entries {
            if let Some(oldest_id) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at())
                .map(|(id, _)| id.clone())
            {
                entries.remove(&oldest_id);
                evicted += 1;
            }
        }

        self.evictions.fetch_add(evicted, Ordering::Relaxed);
    }

    fn avg_hit_similarity(&self) -> Result<f32, DomainError> {
        let totals = self
            .similarity
            .read()
            .map_err(|e| DomainError::internal(format!("Failed to acquire read lock: {}", e)))?;

        if totals.count == 0 {
            return Ok(0.0);
        }

        Ok((totals.sum / totals.count as f64) as f32)
    }
}

#[async_trait]
impl SemanticStore for InMemorySemanticStore {
    async fn search(
        &self,
        embedding: &[f32],
        min_similarity: f32,
        limit: usize,
    ) -> Result<Vec<SemanticSearchResult>, DomainError> {
        let entries = self.read()?;

        let mut results: Vec<SemanticSearchResult> = entries
            .values()
            .filter(|entry| !entry.is_expired())
            .map(|entry| {
                let similarity = cosine_similarity(embedding, entry.embedding());
                SemanticSearchResult::new(entry.clone(), similarity)
            })
            .filter(|result| result.similarity >= min_similarity)
            .collect();

        results.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        results.truncate(limit);

        Ok(results)
    }

    async fn upsert(&self, entry: CachedEntry) -> Result<(), DomainError> {
        let mut entries = self.write()?;

        if !entries.contains_key(entry.id()) {
            self.make_room(&mut entries);
        }
        entries.insert(entry.id().to_string(), entry);

        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<CachedEntry>, DomainError> {
        let entries = self.read()?;
        Ok(entries.get(id).filter(|e| !e.is_expired()).cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let mut entries = self.write()?;
        Ok(entries.remove(id).is_some())
    }

    async fn clear(&self) -> Result<(), DomainError> {
        let mut entries = self.write()?;
        entries.clear();

        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        if let Ok(mut totals) = self.similarity.write() {
            *totals = SimilarityTotals::default();
        }

        Ok(())
    }

    async fn size(&self) -> Result<usize, DomainError> {
        Ok(self.read()?.len())
    }

    async fn stats(&self) -> Result<SemanticCacheStats, DomainError> {
        let total_entries = self.read()?.len();

        Ok(SemanticCacheStats {
            total_entries,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            avg_hit_similarity: self.avg_hit_similarity()?,
        })
    }

    async fn record_hit(&self, id: &str, similarity: f32) -> Result<(), DomainError> {
        self.hits.fetch_add(1, Ordering::Relaxed);

        if let Ok(mut totals) = self.similarity.write() {
            totals.sum += similarity as f64;
            totals.count += 1;
        }

        let mut entries = self.write()?;
        if let Some(entry) = entries.get_mut(id) {
            entry.increment_hits();
        }

        Ok(())
    }

    async fn record_miss(&self) -> Result<(), DomainError> {
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, DomainError> {
        let mut entries = self.write()?;

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());

        Ok(before - entries.len())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn entry(embedding: Vec<f32>, response: &str) -> CachedEntry {
        CachedEntry::new(
            embedding,
            format!("query for {}", response),
            response,
            "openai/gpt-4o-mini",
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = InMemorySemanticStore::new(100);
        let entry = entry(vec![0.1, 0.2, 0.3], "hello");
        let id = entry.id().to_string();

        store.upsert(entry).await.unwrap();

        let retrieved = store.get(&id).await.unwrap().unwrap();
        assert_eq!(retrieved.response(), "hello");
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_embedding() {
        let store = InMemorySemanticStore::new(100);

        store.upsert(entry(vec![1.0, 0.0], "first")).await.unwrap();
        store.upsert(entry(vec![1.0, 0.0], "second")).await.unwrap();

        assert_eq!(store.size().await.unwrap(), 1);
        let results = store.search(&[1.0, 0.0], 0.9, 1).await.unwrap();
        assert_eq!(results[0].entry.response(), "second");
    }

    #[tokio::test]
    async fn test_search_with_threshold() {
        let store = InMemorySemanticStore::new(100);

        store.upsert(entry(vec![1.0, 0.1, 0.0], "similar")).await.unwrap();
        store.upsert(entry(vec![0.0, 1.0, 0.0], "different")).await.unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 0.95, 5).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entry.response(), "similar");
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity() {
        let store = InMemorySemanticStore::new(100);

        store.upsert(entry(vec![1.0, 0.5], "further")).await.unwrap();
        store.upsert(entry(vec![1.0, 0.1], "closer")).await.unwrap();

        let results = store.search(&[1.0, 0.0], 0.5, 5).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].entry.response(), "closer");
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[tokio::test]
    async fn test_expired_entries_are_invisible() {
        let store = InMemorySemanticStore::new(100);
        let expired = CachedEntry::new(vec![1.0, 0.0], "q", "stale", "m", Duration::ZERO);
        let id = expired.id().to_string();

        store.upsert(expired).await.unwrap();

        assert!(store.search(&[1.0, 0.0], 0.5, 1).await.unwrap().is_empty());
        assert!(store.get(&id).await.unwrap().is_none());
        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
        assert_eq!(store.size().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_eviction_when_full() {
        let store = InMemorySemanticStore::new(2);

        store.upsert(entry(vec![1.0, 0.0], "first")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.upsert(entry(vec![0.0, 1.0], "second")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        store.upsert(entry(vec![1.0, 1.0], "third")).await.unwrap();

        assert_eq!(store.size().await.unwrap(), 2);
        assert_eq!(store.stats().await.unwrap().evictions, 1);
        assert!(store.search(&[1.0, 0.0], 0.99, 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemorySemanticStore::new(100);
        let entry = entry(vec![0.1, 0.2], "value");
        let id = entry.id().to_string();

        store.upsert(entry).await.unwrap();
        assert!(store.delete(&id).await.unwrap());
        assert!(!store.delete(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let store = InMemorySemanticStore::new(100);
        let entry = entry(vec![1.0, 0.0], "value");
        let id = entry.id().to_string();

        store.upsert(entry).await.unwrap();
        store.record_hit(&id, 0.98).await.unwrap();
        store.record_hit(&id, 0.96).await.unwrap();
        store.record_miss().await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert!((stats.avg_hit_similarity - 0.97).abs() < 0.001);
        assert_eq!(store.get(&id).await.unwrap().unwrap().hit_count(), 2);

        store.clear().await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats, SemanticCacheStats::default());
    }
}
