//! Routing preview endpoint

use axum::extract::State;
use serde::Deserialize;
use tracing::debug;

use crate::api::middleware::RequireAdmin;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::LlmRequest;
use crate::infrastructure::services::RoutePreview;

#[derive(Debug, Clone, Deserialize)]
pub struct RoutePreviewRequest {
    pub query: String,
}

/// POST /admin/route/preview
///
/// Classifies the query and lists candidate models without calling any
/// backend or touching the cache.
pub async fn preview_route(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(request): Json<RoutePreviewRequest>,
) -> Result<Json<RoutePreview>, ApiError> {
    let llm_request = LlmRequest::builder().user(request.query).build();
    let preview = state.router.preview(&llm_request)?;

    debug!(
        tier = %preview.tier,
        candidates = preview.candidates.len(),
        "Route preview"
    );

    Ok(Json(preview))
}
