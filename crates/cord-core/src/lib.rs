//! # cord-core
//!
//! Domain objects, typed event payloads, and decode helpers shared by the
//! gateway and client crates.

pub mod entities;
pub mod error;
pub mod events;
pub mod maybe;
pub mod value_objects;

pub use entities::{Guild, Member, Message, Role, User};
pub use error::DecodeError;
pub use events::Event;
pub use maybe::Maybe;
pub use value_objects::{Permissions, Snowflake, SnowflakeParseError};

/// Decode a JSON value into a typed domain object.
///
/// Unknown fields are ignored; optional fields absent from the payload
/// decode as [`Maybe::Missing`] (distinct from an explicit `null`).
pub fn decode<T: serde::de::DeserializeOwned>(
    value: &serde_json::Value,
) -> Result<T, DecodeError> {
    serde_json::from_value(value.clone()).map_err(DecodeError::from)
}
