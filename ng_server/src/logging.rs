//! Structured logging configuration.
//!
//! The game library logs through the `log` facade; the subscriber installed
//! here also captures those records, so both end up in the same stream.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var and default to
/// `info`.
///
/// # Example
///
/// ```no_run
/// use ng_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a completed poll request
///
/// # Arguments
///
/// * `method` - HTTP method
/// * `path` - Request path without query string
/// * `status_code` - Response status code
/// * `duration_ms` - Request duration in milliseconds
/// * `player_id` - Identity header, if the request carried one
pub fn log_api_request(
    method: &str,
    path: &str,
    status_code: u16,
    duration_ms: u64,
    player_id: Option<&str>,
) {
    if status_code >= 500 {
        tracing::warn!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            player_id = player_id,
            "API request failed"
        );
    } else {
        tracing::info!(
            http_method = method,
            http_path = path,
            http_status = status_code,
            duration_ms = duration_ms,
            player_id = player_id,
            "API request completed"
        );
    }
}

/// Log a push connection lifecycle event
pub fn log_connection_event(event: &str, connection_id: u64, player_id: Option<&str>) {
    tracing::info!(
        event = event,
        connection_id = connection_id,
        player_id = player_id,
        "Push connection event"
    );
}
