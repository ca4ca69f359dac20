//! Push connection bookkeeping.
//!
//! The registry maps each joined push connection to its player and outbox so
//! that any mutation, from either transport, can fan the new snapshot out to
//! every connected client.

pub mod registry;

pub use registry::{BroadcastReport, ConnectionId, Line, Outbox, SessionRegistry};
