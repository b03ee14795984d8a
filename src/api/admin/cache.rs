//! Semantic cache admin endpoints
//!
//! Every failure, including an unconfigured cache, answers 500 with
//! `{"success": false, "error": ...}`.

use std::sync::Arc;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tracing::{error, info};

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{CacheErrorResponse, CacheOperationResponse, CacheStatsResponse, Json};
use crate::infrastructure::services::SemanticCache;

fn configured_cache(state: &AppState) -> Result<&Arc<SemanticCache>, CacheErrorResponse> {
    state.cache().ok_or_else(CacheErrorResponse::not_configured)
}

/// POST /admin/cache/clear, DELETE /admin/cache
pub async fn clear_cache(State(state): State<AppState>, _admin: RequireAdmin) -> Response {
    let cache = match configured_cache(&state) {
        Ok(cache) => cache,
        Err(e) => return e.into_response(),
    };

    match cache.clear().await {
        Ok(count) => {
            info!(count, "Semantic cache cleared via admin API");
            Json(CacheOperationResponse::cleared(count)).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to clear semantic cache");
            CacheErrorResponse::new(e.to_string()).into_response()
        }
    }
}

/// GET /admin/cache/stats
pub async fn cache_stats(State(state): State<AppState>, _admin: RequireAdmin) -> Response {
    let cache = match configured_cache(&state) {
        Ok(cache) => cache,
        Err(e) => return e.into_response(),
    };

    match cache.stats().await {
        Ok(stats) => Json(CacheStatsResponse::new(
            cache.backend_name(),
            cache.threshold(),
            cache.ttl().as_secs(),
            &stats,
        ))
        .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to read semantic cache stats");
            CacheErrorResponse::new(e.to_string()).into_response()
        }
    }
}

/// POST /admin/cache/purge
pub async fn purge_cache(State(state): State<AppState>, _admin: RequireAdmin) -> Response {
    let cache = match configured_cache(&state) {
        Ok(cache) => cache,
        Err(e) => return e.into_response(),
    };

    match cache.purge_expired().await {
        Ok(count) => Json(CacheOperationResponse::purged(count)).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to purge semantic cache");
            CacheErrorResponse::new(e.to_string()).into_response()
        }
    }
}
