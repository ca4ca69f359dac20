//! Protocol adapters for the game server.
//!
//! Both adapters drive the same shared game through one [`SessionRegistry`],
//! so a mutation made over either transport is broadcast to every push
//! client.
//!
//! # Modules
//!
//! - [`push`]: Persistent newline-delimited JSON connections with server push
//! - [`poll`]: Stateless HTTP request/response endpoints
//! - [`http`]: The small HTTP/1.1 codec the poll adapter uses
//!
//! # Endpoints Overview
//!
//! ## Push (one TCP connection per player)
//! - first line `{"username": "..."}`, answered with `welcome` or `error`
//! - then one action object per line; every change arrives as `game_state`
//!
//! ## Poll
//! - `POST /connect` - Join with `{"username": "..."}`
//! - `GET /gamestate` - Current snapshot (requires `X-Player-ID`)
//! - `POST /action` - Submit one action (requires `X-Player-ID`)
//! - `POST /disconnect` - Leave the game (requires `X-Player-ID`)
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use ng_server::{api::Server, config::ServerConfig};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let server = Server::bind(&ServerConfig::default()).await?;
//! server.run(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//! # Ok(())
//! # }
//! ```

pub mod http;
pub mod poll;
pub mod push;

use anyhow::Context;
use number_guess::{SessionRegistry, TableActor};
use std::{future::Future, net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;

use crate::{config::ServerConfig, metrics};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Connection registry, which also owns the handle to the game table
    pub registry: Arc<SessionRegistry>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Build state around a freshly spawned table actor.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: ServerConfig) -> Self {
        let table = TableActor::spawn(config.table_config());
        Self {
            registry: Arc::new(SessionRegistry::new(table)),
            config: Arc::new(config),
        }
    }

    /// Push the latest snapshot to every connected push client.
    pub async fn broadcast(&self) {
        match self.registry.broadcast().await {
            Ok(report) => metrics::broadcast(report.delivered, report.dead),
            Err(e) => log::error!("Broadcast failed: {e}"),
        }
    }
}

/// Bound listeners plus the state they share
pub struct Server {
    state: AppState,
    push_listener: Option<TcpListener>,
    poll_listener: Option<TcpListener>,
}

impl Server {
    /// Bind the listeners the configured mode asks for and start the table.
    pub async fn bind(config: &ServerConfig) -> anyhow::Result<Self> {
        let push_listener = if config.mode.serves_push() {
            let listener = TcpListener::bind(config.push_bind)
                .await
                .with_context(|| format!("Failed to bind push adapter to {}", config.push_bind))?;
            Some(listener)
        } else {
            None
        };

        let poll_listener = if config.mode.serves_poll() {
            let listener = TcpListener::bind(config.poll_bind)
                .await
                .with_context(|| format!("Failed to bind poll adapter to {}", config.poll_bind))?;
            Some(listener)
        } else {
            None
        };

        Ok(Self {
            state: AppState::new(config.clone()),
            push_listener,
            poll_listener,
        })
    }

    /// Actual push address, useful when bound to port 0
    pub fn push_addr(&self) -> Option<SocketAddr> {
        self.push_listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
    }

    /// Actual poll address, useful when bound to port 0
    pub fn poll_addr(&self) -> Option<SocketAddr> {
        self.poll_listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Serve until `shutdown` resolves, then stop accepting and close the table.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        let mut tasks = Vec::new();

        if let Some(listener) = self.push_listener {
            log::info!("Push adapter listening on {}", listener.local_addr()?);
            tasks.push(tokio::spawn(push::serve(listener, self.state.clone())));
        }
        if let Some(listener) = self.poll_listener {
            log::info!("Poll adapter listening on {}", listener.local_addr()?);
            tasks.push(tokio::spawn(poll::serve(listener, self.state.clone())));
        }

        shutdown.await;
        log::info!("Shutting down server...");

        for task in tasks {
            task.abort();
        }
        if let Err(e) = self.state.registry.table().close().await {
            log::warn!("Table already closed: {e}");
        }

        Ok(())
    }
}
