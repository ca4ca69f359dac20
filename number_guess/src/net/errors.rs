//! Wire-level error types for line framing and JSON encoding.

use thiserror::Error;

/// Errors that can occur while encoding or decoding a protocol line
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The line is not valid JSON for the expected message
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Encoded line would exceed the framing limit
    #[error("Message size {actual} exceeds maximum {max}")]
    MessageTooLarge { actual: usize, max: usize },
}

/// Payload of the `InvalidData` error returned when a peer sends more than
/// [`MAX_LINE_LENGTH`](super::utils::MAX_LINE_LENGTH) bytes without a newline
#[derive(Debug, Error)]
#[error("line not terminated after {read} bytes")]
pub struct LineTooLong {
    pub read: usize,
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
