//! Admin API key extractor

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use crate::api::state::{hash_admin_key, AppState};
use crate::api::types::ApiError;

/// Extractor that requires the configured admin key.
///
/// The key is read from `Authorization: Bearer <key>` or `X-Admin-Key`, and
/// compared by SHA-256 digest.
#[derive(Debug, Clone, Copy)]
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.admin_key_hash() else {
            return Err(ApiError::forbidden(
                "Admin API is disabled: no admin key configured",
            ));
        };

        let provided = extract_admin_key(&parts.headers)?;

        if !digests_match(&hash_admin_key(&provided), expected) {
            warn!(path = %parts.uri.path(), "Rejected invalid admin key");
            return Err(ApiError::unauthorized("Invalid admin key"));
        }

        debug!(path = %parts.uri.path(), "Admin access granted");
        Ok(RequireAdmin)
    }
}

fn extract_admin_key(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid Authorization header encoding"))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    if let Some(value) = headers.get("x-admin-key") {
        let key = value
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid X-Admin-Key header encoding"))?;

        return Ok(key.trim().to_string());
    }

    Err(ApiError::unauthorized(
        "Admin key required. Provide via 'Authorization: Bearer <key>' or 'X-Admin-Key: <key>' header",
    ))
}

/// Comparison whose duration does not depend on where the digests differ
fn digests_match(a: &str, b: &str) -> bool {
    a.len() == b.len()
        && a
            .bytes()
            .zip(b.bytes())
            .fold(0u8, |acc, (x, y)| acc | (x ^ y))
            == 0
}
