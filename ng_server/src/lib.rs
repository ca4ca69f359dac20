//! Game server library: configuration, logging, metrics and the push and
//! poll adapters. `main.rs` wires these together; integration tests use them
//! directly to run a server on ephemeral ports.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
