//! Observability settings: OTLP trace export and the Prometheus endpoint

use serde::Deserialize;

use crate::domain::DomainError;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ObservabilityConfig {
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl ObservabilityConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if !(0.0..=1.0).contains(&self.tracing.sampling_ratio) {
            return Err(DomainError::configuration(format!(
                "observability.tracing.sampling_ratio must be within [0, 1], got {}",
                self.tracing.sampling_ratio
            )));
        }

        if !self.metrics.path.starts_with('/') {
            return Err(DomainError::configuration(
                "observability.metrics.path must start with '/'",
            ));
        }

        let buckets = &self.metrics.latency_buckets;
        if buckets.is_empty() || buckets.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(DomainError::configuration(
                "observability.metrics.latency_buckets must be non-empty and strictly increasing",
            ));
        }

        Ok(())
    }
}

/// OpenTelemetry export; off unless `enabled`
#[derive(Debug, Clone, Deserialize)]
pub struct TracingConfig {
    #[serde(default)]
    pub enabled: bool,
    /// gRPC collector endpoint
    #[serde(default = "default_otlp_endpoint")]
    pub otlp_endpoint: String,
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Share of root spans kept, in `[0, 1]`
    #[serde(default = "default_sampling_ratio")]
    pub sampling_ratio: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_path")]
    pub path: String,
    /// Histogram buckets in seconds for every `*_seconds` metric. Cache hits
    /// land in the millisecond range, model calls in whole seconds.
    #[serde(default = "default_latency_buckets")]
    pub latency_buckets: Vec<f64>,
}

fn default_otlp_endpoint() -> String {
    "http://localhost:4317".to_string()
}

fn default_service_name() -> String {
    "llm-tier-router".to_string()
}

fn default_sampling_ratio() -> f64 {
    1.0
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_latency_buckets() -> Vec<f64> {
    vec![
        0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
    ]
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: default_otlp_endpoint(),
            service_name: default_service_name(),
            sampling_ratio: default_sampling_ratio(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            path: default_metrics_path(),
            latency_buckets: default_latency_buckets(),
        }
    }
}
