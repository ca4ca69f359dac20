//! Table module wrapping the game engine in an async actor.
//!
//! This module implements:
//! - TableActor: Tokio task that exclusively owns the [`GameEngine`](crate::game::GameEngine)
//! - TableHandle: Cloneable front door that talks to the actor over channels
//! - Table configuration
//!
//! ## Architecture
//!
//! The table runs in a separate Tokio task with an mpsc message inbox. Every
//! request carries a oneshot channel for the reply. Because the actor handles
//! one message at a time, the engine never needs a lock of its own and no
//! operation can observe another half-applied.
//!
//! ## Example
//!
//! ```no_run
//! use number_guess::table::{TableActor, TableConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let handle = TableActor::spawn(TableConfig::default());
//!     let snapshot = handle.snapshot().await.unwrap();
//!     println!("{}", snapshot.round_message);
//! }
//! ```

pub mod actor;
pub mod config;
pub mod messages;

pub use actor::{TableActor, TableHandle};
pub use config::TableConfig;
pub use messages::{TableError, TableMessage};
