//! Gateway error types

use crate::protocol::{CloseCode, WireError};
use thiserror::Error;

/// Gateway error type
///
/// Transport and protocol failures are handled internally by state
/// transitions; only unrecoverable variants (`FatalAuth`,
/// `RetriesExhausted`) propagate out of a shard's run loop.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// A frame failed to encode or decode
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// Opening the socket failed
    #[error("connect failed: {0}")]
    Connect(String),

    /// The established socket failed mid-session
    #[error("transport error: {0}")]
    Transport(String),

    /// The server sent a control frame the state machine cannot accept
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server rejected our credentials or shard setup; not retried
    #[error("fatal close: {0}")]
    FatalAuth(CloseCode),

    /// The reconnect budget is exhausted
    #[error("connect retry budget exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// An operation that requires a Ready session was attempted early
    #[error("shard is not ready")]
    NotReady,
}

impl GatewayError {
    /// True for errors that terminate the shard rather than degrade it
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::FatalAuth(_) | Self::RetriesExhausted { .. })
    }
}
