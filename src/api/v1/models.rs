//! Models endpoint handler

use axum::extract::State;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiModel, Json, ModelsResponse};

/// GET /v1/models
///
/// Lists every routable backend with its profile. Clients cannot pick a
/// model; the listing is informational.
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let models: Vec<ApiModel> = state
        .registry()
        .adapters()
        .iter()
        .map(|adapter| ApiModel::from_profile(adapter.profile()))
        .collect();

    debug!(count = models.len(), "Listing models");

    Json(ModelsResponse::new(models))
}
