//! Prometheus metrics infrastructure

use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use regex::Regex;

use super::config::MetricsConfig;
use crate::domain::{CacheStatus, RouteDecision};

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").unwrap()
});

static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

const MAX_PATH_LABEL_LEN: usize = 50;

/// Prometheus metrics handle for serving metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
    path: String,
}

impl PrometheusMetrics {
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Install the Prometheus recorder. Returns `None` when disabled or when a
/// recorder is already installed.
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    let builder = match PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Suffix("_seconds".to_string()), &config.latency_buckets)
    {
        Ok(builder) => builder,
        Err(e) => {
            tracing::error!(error = %e, "Invalid metrics histogram buckets");
            return None;
        }
    };

    match builder.install_recorder() {
        Ok(handle) => {
            gauge!("llm_router_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!(path = %config.path, "Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
                path: config.path.clone(),
            })
        }
        Err(e) => {
            tracing::error!("Failed to initialize Prometheus metrics: {}", e);
            None
        }
    }
}

/// Router serving the metrics endpoint
pub fn create_metrics_router(metrics: PrometheusMetrics) -> Router {
    let path = metrics.path.clone();

    Router::new()
        .route(&path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record the outcome of routing one request
pub fn record_route_decision(decision: &RouteDecision) {
    counter!(
        "router_decisions_total",
        "tier" => decision.tier.as_str(),
        "model" => decision.model_id.clone(),
        "cache_status" => decision.cache_status.as_str(),
    )
    .increment(1);

    histogram!(
        "router_decision_latency_seconds",
        "cache_hit" => if decision.cache_hit { "true" } else { "false" },
    )
    .record(decision.latency_ms as f64 / 1000.0);
}

/// Record that the cache was skipped or failed for a request
pub fn record_cache_bypass(status: CacheStatus) {
    counter!("semantic_cache_bypass_total", "reason" => status.as_str()).increment(1);
}

/// Record a failed model attempt that led to trying the next candidate
pub fn record_fallback(model_id: &str) {
    counter!("router_fallbacks_total", "model" => model_id.to_string()).increment(1);
}

/// Record that every candidate for a tier failed
pub fn record_upstream_exhausted(tier: &str) {
    counter!("router_upstream_failures_total", "tier" => tier.to_string()).increment(1);
}

/// Record a background cache write
pub fn record_cache_write(success: bool) {
    counter!(
        "semantic_cache_writes_total",
        "outcome" => if success { "stored" } else { "failed" },
    )
    .increment(1);
}

pub fn record_cache_clear(count: usize) {
    counter!("semantic_cache_clears_total").increment(1);
    counter!("semantic_cache_cleared_entries_total").increment(count as u64);
}

pub fn record_cache_size(entries: usize) {
    gauge!("semantic_cache_entries").set(entries as f64);
}

/// Replace IDs in a URL path so metric labels stay low-cardinality
fn sanitize_path(path: &str) -> String {
    let path = UUID_SEGMENT.replace_all(path, "{id}");
    let path = NUMERIC_SEGMENT.replace_all(&path, "/{id}$1");

    path.chars().take(MAX_PATH_LABEL_LEN).collect()
}
