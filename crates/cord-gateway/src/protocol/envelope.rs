//! Gateway envelope
//!
//! One parsed unit of the wire protocol: op code, optional sequence,
//! optional event name, and an opaque payload.

use super::{Hello, Identify, Opcode, Resume, StatusUpdate};
use flate2::read::ZlibDecoder;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::Read;
use thiserror::Error;

/// Error decoding or encoding a wire frame.
///
/// A wire error is confined to the frame that produced it; the session
/// reports it and keeps reading.
#[derive(Debug, Error)]
pub enum WireError {
    /// The frame is not valid JSON for the envelope shape
    #[error("invalid frame: {0}")]
    Json(#[from] serde_json::Error),

    /// A compressed frame failed to inflate
    #[error("inflate failed: {0}")]
    Inflate(#[from] std::io::Error),
}

/// Gateway envelope
///
/// All frames on the gateway connection follow this shape. The wire uses
/// short field names: `op`, `s` (sequence, Dispatch only), `t` (event
/// name, Dispatch only), `d` (payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Operation code
    pub op: Opcode,

    /// Sequence number (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event type (only for op=0 Dispatch)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Event data payload
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub d: Value,
}

impl Envelope {
    // === Outbound control frames ===

    /// Create a Heartbeat frame (op=1) carrying the sequence watermark
    #[must_use]
    pub fn heartbeat(sequence: Option<u64>) -> Self {
        Self {
            op: Opcode::Heartbeat,
            s: None,
            t: None,
            d: sequence.map_or(Value::Null, |s| Value::Number(s.into())),
        }
    }

    /// Create an Identify frame (op=2)
    #[must_use]
    pub fn identify(payload: &Identify) -> Self {
        Self {
            op: Opcode::Identify,
            s: None,
            t: None,
            d: serde_json::to_value(payload).unwrap_or_default(),
        }
    }

    /// Create a Resume frame (op=6)
    #[must_use]
    pub fn resume(payload: &Resume) -> Self {
        Self {
            op: Opcode::Resume,
            s: None,
            t: None,
            d: serde_json::to_value(payload).unwrap_or_default(),
        }
    }

    /// Create a StatusUpdate frame (op=3)
    #[must_use]
    pub fn status_update(payload: &StatusUpdate) -> Self {
        Self {
            op: Opcode::StatusUpdate,
            s: None,
            t: None,
            d: serde_json::to_value(payload).unwrap_or_default(),
        }
    }

    /// Create a Dispatch frame (op=0); used by tests and simulations
    #[must_use]
    pub fn dispatch(event_type: impl Into<String>, sequence: u64, data: Value) -> Self {
        Self {
            op: Opcode::Dispatch,
            s: Some(sequence),
            t: Some(event_type.into()),
            d: data,
        }
    }

    // === Parsing inbound control frames ===

    /// Try to parse as a Hello payload (op=10)
    pub fn as_hello(&self) -> Option<Hello> {
        if self.op != Opcode::Hello {
            return None;
        }
        serde_json::from_value(self.d.clone()).ok()
    }

    /// For an InvalidSession frame (op=9), whether the session is resumable
    pub fn invalid_session_resumable(&self) -> Option<bool> {
        if self.op != Opcode::InvalidSession {
            return None;
        }
        Some(self.d.as_bool().unwrap_or(false))
    }

    /// The dispatch event name, if this is a Dispatch frame
    pub fn event_name(&self) -> Option<&str> {
        match self.op {
            Opcode::Dispatch => self.t.as_deref(),
            _ => None,
        }
    }

    // === Codec ===

    /// Decode a wire frame.
    ///
    /// Zlib-compressed frames (leading `0x78` CMF byte) are transparently
    /// inflated before JSON parsing. Unknown op codes decode successfully
    /// as [`Opcode::Unknown`].
    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        // zlib CMF byte; JSON text always starts with '{' (0x7B)
        if bytes.first() == Some(&0x78) {
            let mut inflated = Vec::new();
            ZlibDecoder::new(bytes).read_to_end(&mut inflated)?;
            Ok(serde_json::from_slice(&inflated)?)
        } else {
            Ok(serde_json::from_slice(bytes)?)
        }
    }

    /// Encode to a JSON wire frame
    pub fn encode(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "Envelope(op={}, t={t}", self.op)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "Envelope(op={})", self.op)
        }
    }
}
