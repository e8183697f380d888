//! Decode error type

use thiserror::Error;

/// Error decoding a wire payload into a typed domain object.
///
/// A decode failure affects a single payload; it is never fatal to the
/// session that received it.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload failed JSON-level deserialization
    #[error("invalid payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),

    /// A field the event requires was not present
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}
