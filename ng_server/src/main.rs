//! Number guessing game server.
//!
//! Serves one shared game over a persistent push transport, a stateless
//! HTTP poll transport, or both at once.

use anyhow::{Error, bail};
use log::info;
use ng_server::{
    api::Server,
    config::{CliOverrides, ServerConfig},
    logging, metrics,
};
use pico_args::Arguments;

const HELP: &str = "\
Run a multiplayer number guessing game server

USAGE:
  ng_server [OPTIONS]

OPTIONS:
  --mode          MODE       push, poll or both     [default: env SERVER_MODE or both]
  --push-bind     IP:PORT    Push adapter address   [default: env PUSH_BIND or 127.0.0.1:8000]
  --poll-bind     IP:PORT    Poll adapter address   [default: env POLL_BIND or 127.0.0.1:8080]
  --players       N          Players per game       [default: env REQUIRED_PLAYERS or 2]
  --metrics-bind  IP:PORT    Prometheus exporter    [default: env METRICS_BIND or disabled]

FLAGS:
  -h, --help                 Print help information

ENVIRONMENT:
  MIN_PLAYERS                Departures below this reset the game [default: players]
  POLL_HEADER_TIMEOUT_SECS   Seconds a poll client has to send its request [default: 15]
  RUST_LOG                   Log filter [default: info]
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let overrides = CliOverrides {
        mode: pargs.opt_value_from_str("--mode")?,
        push_bind: pargs.opt_value_from_str("--push-bind")?,
        poll_bind: pargs.opt_value_from_str("--poll-bind")?,
        required_players: pargs.opt_value_from_str("--players")?,
        metrics_bind: pargs.opt_value_from_str("--metrics-bind")?,
    };
    let remaining = pargs.finish();
    if !remaining.is_empty() {
        bail!("unexpected arguments: {remaining:?}");
    }

    let config = ServerConfig::from_env(overrides)?;
    config.validate()?;

    logging::init();
    info!(
        "Starting number guessing server (mode: {}, players: {})",
        config.mode, config.required_players
    );

    if let Some(addr) = config.metrics_bind {
        metrics::init_metrics(addr).map_err(Error::msg)?;
        info!("Prometheus metrics available at http://{addr}/metrics");
    }

    let server = Server::bind(&config).await?;
    server.run(shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
}
