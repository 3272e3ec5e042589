//! Prometheus exporter.

use crate::config::MetricsConfig;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use thiserror::Error;

/// Latency buckets for `*_duration_seconds` histograms
const DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Exporter setup failures
#[derive(Error, Debug)]
pub enum MetricsError {
    /// `METRICS_HOST:METRICS_PORT` is not a socket address
    #[error("Invalid metrics address {0}")]
    Address(String),

    /// Building or installing the exporter failed
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install the recorder and serve `/metrics` on the configured address.
///
/// Does nothing when metrics are disabled. Must run inside the Tokio runtime.
///
/// # Errors
///
/// [`MetricsError`] for a bad address, or when a recorder is already installed.
pub fn install(config: &MetricsConfig) -> Result<(), MetricsError> {
    if !config.enabled {
        tracing::info!("Metrics disabled");
        return Ok(());
    }
    let raw = format!("{}:{}", config.host, config.port);
    let addr: SocketAddr = raw.parse().map_err(|_| MetricsError::Address(raw.clone()))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Suffix("duration_seconds".to_string()), DURATION_BUCKETS)
        .map_err(|e| MetricsError::Install(e.to_string()))?
        .install()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    ticketbooth_core::metrics::register_business_metrics();
    describe_http_metrics();
    tracing::info!(%addr, "Metrics exporter listening at http://{addr}/metrics");
    Ok(())
}

fn describe_http_metrics() {
    metrics::describe_counter!("ticketbooth_http_requests_total", "HTTP requests by method and status");
    metrics::describe_counter!("ticketbooth_http_errors_total", "Error responses by error code");
    metrics::describe_histogram!(
        "ticketbooth_http_request_duration_seconds",
        metrics::Unit::Seconds,
        "HTTP request latency"
    );
}
