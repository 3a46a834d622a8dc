//! Observability utilities for the cost assistant.
//!
//! This crate provides:
//! - Prometheus metrics recording and export
//! - Custom metrics for LLM round trips, tool calls and billing queries
//! - Axum middleware for automatic request metrics
//!
//! # Example
//!
//! ```rust,ignore
//! use observability::{init_metrics, metrics_handler, ChatMetrics};
//!
//! init_metrics();
//!
//! ChatMetrics::record_tool_call("get_aws_cost_summary", "success");
//!
//! let app = Router::new()
//!     .route("/metrics", get(metrics_handler))
//!     .layer(axum::middleware::from_fn(metrics_middleware));
//! ```

pub mod billing;
pub mod chat;
pub mod middleware;

pub use billing::{BillingMetrics, BillingTimer};
pub use chat::ChatMetrics;
pub use middleware::metrics_middleware;

// Re-export metrics macros for convenience
pub use metrics::{counter, gauge, histogram};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

static METRICS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize the Prometheus metrics recorder.
///
/// Call once at startup. Returns `None` if another global recorder is
/// already installed; metrics are then recorded into that recorder and
/// `/metrics` reports them as unavailable.
pub fn init_metrics() -> Option<&'static PrometheusHandle> {
    if let Some(handle) = METRICS_HANDLE.get() {
        return Some(handle);
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            info!("Prometheus metrics recorder initialized");
            register_metric_descriptions();
            Some(METRICS_HANDLE.get_or_init(|| handle))
        }
        Err(e) => {
            warn!("Failed to install Prometheus recorder: {}", e);
            None
        }
    }
}

/// Get the metrics handle (must call init_metrics first)
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Axum handler for /metrics endpoint
pub async fn metrics_handler() -> String {
    match get_metrics_handle() {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}

/// Register metric descriptions for documentation
fn register_metric_descriptions() {
    use metrics::describe_counter;
    use metrics::describe_histogram;

    // HTTP metrics
    describe_counter!("http_requests_total", "Total number of HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
    describe_counter!(
        "http_requests_errors_total",
        "Total number of HTTP request errors"
    );

    // Chat metrics
    describe_counter!(
        "llm_round_trips_total",
        "LLM chat-completion round trips by round and outcome"
    );
    describe_histogram!(
        "llm_round_trip_duration_seconds",
        "LLM chat-completion round trip duration in seconds"
    );
    describe_counter!(
        "tool_calls_total",
        "Tool calls requested by the model, by function and outcome"
    );

    // Billing metrics
    describe_counter!(
        "billing_queries_total",
        "Cost Explorer queries by operation and outcome"
    );
    describe_histogram!(
        "billing_query_duration_seconds",
        "Cost Explorer query duration in seconds"
    );
}
