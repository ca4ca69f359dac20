//! Wire formats shared by the server adapters and the test client.
//!
//! The push transport carries one JSON object per `\n`-terminated line in
//! both directions. The poll transport reuses the same JSON payloads inside
//! HTTP bodies.

/// Blocking line-protocol client, mostly useful for tests and bots.
pub mod client;

/// Protocol error types.
pub mod errors;

/// Messages exchanged by clients and the server.
pub mod messages;

/// Newline-delimited JSON framing.
pub mod utils;
