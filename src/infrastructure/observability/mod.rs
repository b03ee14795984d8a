//! Observability infrastructure - Tracing and Metrics

mod config;
mod metrics;
mod tracing_setup;

pub use config::{MetricsConfig, ObservabilityConfig, TracingConfig};
pub use metrics::{
    create_metrics_router, init_metrics, record_cache_bypass, record_cache_clear,
    record_cache_size, record_cache_write, record_fallback, record_http_request,
    record_route_decision, record_upstream_exhausted, PrometheusMetrics,
};
pub use tracing_setup::{init_tracing, shutdown_tracing};
