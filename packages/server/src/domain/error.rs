//! Domain error types.

use thiserror::Error;

/// Value object validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// Room name is empty or whitespace only
    #[error("room id must not be empty")]
    EmptyRoomId,

    /// Connection id is empty
    #[error("connection id must not be empty")]
    EmptyConnectionId,
}

/// Failure to serialize an envelope
#[derive(Debug, Error)]
#[error("failed to encode envelope: {0}")]
pub struct EnvelopeError(#[from] pub serde_json::Error);

/// Errors raised by a duplex transport.
///
/// Every variant is terminal for the connection that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The peer closed the connection (cleanly or not)
    #[error("transport closed")]
    Closed,

    /// Reading the next frame failed
    #[error("transport read failed: {0}")]
    Read(String),

    /// Writing a frame failed
    #[error("transport write failed: {0}")]
    Write(String),
}
