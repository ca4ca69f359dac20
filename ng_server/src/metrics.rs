//! Prometheus metrics for monitoring game server health.
//!
//! When enabled, metrics are exposed in Prometheus text format at
//! `http://<METRICS_BIND>/metrics`. When the exporter is not installed the
//! recording calls are no-ops.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ng_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::poll_requests_total("GET", "/gamestate", 200);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))
}

// ============================================================================
// Poll Metrics
// ============================================================================

/// Record a poll request with method, path and status labels.
pub fn poll_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("poll_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record poll request duration in milliseconds.
pub fn poll_request_duration_ms(path: &str, duration_ms: f64) {
    metrics::histogram!("poll_request_duration_ms",
        "path" => path.to_string()
    )
    .record(duration_ms);
}

// ============================================================================
// Push Metrics
// ============================================================================

/// Set current active push connections count.
pub fn push_connections_active(count: usize) {
    metrics::gauge!("push_connections_active").set(count as f64);
}

/// Increment total push connections counter.
pub fn push_connections_total() {
    metrics::counter!("push_connections_total").increment(1);
}

/// Increment rejected push handshakes counter.
pub fn push_handshakes_rejected(reason: &'static str) {
    metrics::counter!("push_handshakes_rejected", "reason" => reason).increment(1);
}

// ============================================================================
// Game Metrics
// ============================================================================

/// Increment actions received, labelled by adapter and whether they applied.
pub fn actions_total(adapter: &'static str, accepted: bool) {
    metrics::counter!("actions_total",
        "adapter" => adapter,
        "accepted" => accepted.to_string()
    )
    .increment(1);
}

/// Record one broadcast's delivery outcome.
pub fn broadcast(delivered: usize, dead: usize) {
    metrics::counter!("broadcasts_total").increment(1);
    metrics::counter!("broadcast_messages_sent").increment(delivered as u64);
    metrics::counter!("broadcast_messages_undeliverable").increment(dead as u64);
}
