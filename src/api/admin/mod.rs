//! Admin API endpoints for operating the router

pub mod cache;
pub mod route;

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::state::AppState;

/// Create admin API router
pub fn create_admin_router() -> Router<AppState> {
    Router::new()
        // Semantic cache management
        .route("/cache", delete(cache::clear_cache))
        .route("/cache/clear", post(cache::clear_cache))
        .route("/cache/stats", get(cache::cache_stats))
        .route("/cache/purge", post(cache::purge_cache))
        // Routing diagnostics
        .route("/route/preview", post(route::preview_route))
}
