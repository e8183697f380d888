//! Gateway wire protocol
//!
//! Defines the protocol envelope, op codes, close codes, and control
//! payloads. Numeric values are fixed by the remote service and must
//! match it bit-for-bit.

mod close_codes;
mod envelope;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use envelope::{Envelope, WireError};
pub use opcodes::Opcode;
pub use payloads::{ConnectionProperties, Hello, Identify, Intents, Resume, StatusUpdate};
