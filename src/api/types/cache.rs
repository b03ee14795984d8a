//! Admin cache management bodies

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::domain::SemanticCacheStats;

/// Result of a bulk cache operation (`clear`, `purge`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheOperationResponse {
    pub success: bool,
    pub count: usize,
    pub message: String,
}

impl CacheOperationResponse {
    pub fn cleared(count: usize) -> Self {
        Self {
            success: true,
            count,
            message: format!("Cleared {} cache entries", count),
        }
    }

    pub fn purged(count: usize) -> Self {
        Self {
            success: true,
            count,
            message: format!("Purged {} expired cache entries", count),
        }
    }
}

/// Failure body for cache endpoints, always sent with 500
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheErrorResponse {
    pub success: bool,
    pub error: String,
}

impl CacheErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }

    pub fn not_configured() -> Self {
        Self::new("Semantic cache is not configured")
    }
}

impl IntoResponse for CacheErrorResponse {
    fn into_response(self) -> Response {
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStatsResponse {
    pub backend: String,
    pub similarity_threshold: f32,
    pub ttl_secs: u64,
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f32,
    pub avg_hit_similarity: f32,
}

impl CacheStatsResponse {
    pub fn new(
        backend: &str,
        similarity_threshold: f32,
        ttl_secs: u64,
        stats: &SemanticCacheStats,
    ) -> Self {
        Self {
            backend: backend.to_string(),
            similarity_threshold,
            ttl_secs,
            entries: stats.total_entries,
            hits: stats.hits,
            misses: stats.misses,
            evictions: stats.evictions,
            hit_rate: stats.hit_rate(),
            avg_hit_similarity: stats.avg_hit_similarity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleared_body_shape() {
        let json = serde_json::to_value(CacheOperationResponse::cleared(2)).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["count"], 2);
        assert_eq!(json["message"], "Cleared 2 cache entries");
    }

    #[test]
    fn test_error_body_is_500() {
        let response = CacheErrorResponse::not_configured().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = serde_json::to_value(CacheErrorResponse::new("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "error": "boom"}));
    }
}
