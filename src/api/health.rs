//! Health check endpoints for Kubernetes probes

use std::time::Instant;

use axum::{extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::api::types::Json;

use super::state::AppState;

/// Detailed health response with component status
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Health check status
#[derive(Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health check
#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

/// Simple health check - returns 200 if the service is running
/// Used for basic liveness probes
pub async fn health_check() -> impl IntoResponse {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: None,
        latency_ms: None,
    };

    (StatusCode::OK, Json(response))
}

/// Readiness check with dependency verification
///
/// Unhealthy when no model is registered. An unreachable cache only
/// degrades readiness, since routing fails open without it.
pub async fn ready_check(State(state): State<AppState>) -> impl IntoResponse {
    let start = Instant::now();
    let mut checks = vec![check_registry(&state)];

    if let Some(cache_check) = check_cache(&state).await {
        checks.push(cache_check);
    }

    let overall_status = overall_status(&checks);
    let latency = start.elapsed().as_millis() as u64;
    let response = HealthResponse {
        status: overall_status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks: Some(checks),
        latency_ms: Some(latency),
    };

    let status_code = match overall_status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Degraded => StatusCode::OK, // Still accept requests
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Liveness check - simple check to verify the service is running
/// Used for Kubernetes liveness probes to detect crashes
pub async fn live_check() -> impl IntoResponse {
    StatusCode::OK
}

fn overall_status(checks: &[HealthCheck]) -> HealthStatus {
    checks
        .iter()
        .map(|check| check.status)
        .fold(HealthStatus::Healthy, |acc, status| match (acc, status) {
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => {
                HealthStatus::Unhealthy
            }
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Healthy,
        })
}

fn check_registry(state: &AppState) -> HealthCheck {
    let registry = state.registry();

    let (status, message) = if registry.is_empty() {
        (HealthStatus::Unhealthy, Some("No models registered".to_string()))
    } else {
        let uncovered = registry.uncovered_tiers();
        if uncovered.is_empty() {
            (HealthStatus::Healthy, None)
        } else {
            let tiers: Vec<&str> = uncovered.iter().map(|t| t.as_str()).collect();
            (
                HealthStatus::Degraded,
                Some(format!("No model serves tiers: {}", tiers.join(", "))),
            )
        }
    };

    HealthCheck {
        name: "model_registry".to_string(),
        status,
        message,
        latency_ms: None,
    }
}

async fn check_cache(state: &AppState) -> Option<HealthCheck> {
    let cache = state.cache()?;
    let start = Instant::now();

    let check = match cache.size().await {
        Ok(_) => HealthCheck {
            name: "semantic_cache".to_string(),
            status: HealthStatus::Healthy,
            message: None,
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
        Err(e) => HealthCheck {
            name: "semantic_cache".to_string(),
            status: HealthStatus::Degraded,
            message: Some(e.to_string()),
            latency_ms: Some(start.elapsed().as_millis() as u64),
        },
    };

    Some(check)
}
