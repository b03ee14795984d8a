use std::fmt;

use serde::Serialize;

use super::ComplexityTier;

/// How the semantic cache took part in a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Hit,
    Miss,
    /// The embedding call failed or timed out, the cache was skipped
    EmbeddingUnavailable,
    /// The store failed or timed out, the lookup counted as a miss
    StoreUnavailable,
    /// No cache is configured
    Disabled,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::EmbeddingUnavailable => "embedding_unavailable",
            Self::StoreUnavailable => "store_unavailable",
            Self::Disabled => "disabled",
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit)
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of routing one request, reported as metadata and metrics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteDecision {
    pub tier: ComplexityTier,
    /// Model that produced the answer; for hits, the model that produced the cached answer
    pub model_id: String,
    pub cache_hit: bool,
    pub cache_status: CacheStatus,
    /// Number of models invoked, zero for cache hits
    pub attempts: usize,
    /// Milliseconds from arrival until the answer started streaming
    pub latency_ms: u64,
}

impl RouteDecision {
    pub fn cache_hit(tier: ComplexityTier, model_id: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            tier,
            model_id: model_id.into(),
            cache_hit: true,
            cache_status: CacheStatus::Hit,
            attempts: 0,
            latency_ms,
        }
    }

    pub fn model_call(
        tier: ComplexityTier,
        model_id: impl Into<String>,
        cache_status: CacheStatus,
        attempts: usize,
        latency_ms: u64,
    ) -> Self {
        Self {
            tier,
            model_id: model_id.into(),
            cache_hit: false,
            cache_status,
            attempts,
            latency_ms,
        }
    }
}
