use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::embedding::embedding_fingerprint;

/// A prior (query, response) pair indexed by its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedEntry {
    /// Derived from the embedding, so equal embeddings share one entry
    id: String,
    embedding: Vec<f32>,
    query_text: String,
    response: String,
    /// Model that produced the response
    model_id: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    hit_count: u64,
}

impl CachedEntry {
    pub fn new(
        embedding: Vec<f32>,
        query_text: impl Into<String>,
        response: impl Into<String>,
        model_id: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let now = Utc::now();
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);

        Self {
            id: embedding_fingerprint(&embedding),
            embedding,
            query_text: query_text.into(),
            response: response.into(),
            model_id: model_id.into(),
            created_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
            hit_count: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    /// Remaining lifetime, zero once expired
    pub fn remaining_ttl(&self) -> Duration {
        (self.expires_at - Utc::now()).to_std().unwrap_or(Duration::ZERO)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn increment_hits(&mut self) {
        self.hit_count += 1;
    }

    /// Replace the hit count with one tracked outside the entry
    pub fn with_hit_count(mut self, hit_count: u64) -> Self {
        self.hit_count = hit_count;
        self
    }
}

/// Result of a similarity search over the store
#[derive(Debug, Clone)]
pub struct SemanticSearchResult {
    pub entry: CachedEntry,
    /// Cosine similarity to the probe embedding
    pub similarity: f32,
}

impl SemanticSearchResult {
    pub fn new(entry: CachedEntry, similarity: f32) -> Self {
        Self { entry, similarity }
    }
}

/// Counters exposed by a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SemanticCacheStats {
    pub total_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Average similarity of hits
    pub avg_hit_similarity: f32,
}

impl SemanticCacheStats {
    pub fn hit_rate(&self) -> f32 {
        let total = self.hits + self.misses;

        if total == 0 {
            return 0.0;
        }

        self.hits as f32 / total as f32
    }
}
