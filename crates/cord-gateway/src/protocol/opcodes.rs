//! Gateway operation codes
//!
//! Op codes define the type of frame being sent or received over the
//! gateway connection. Values are the remote service's defined integers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Gateway operation codes
///
/// Unknown integers decode as [`Opcode::Unknown`] and are carried through
/// opaquely so that new server-side op codes never break the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Server dispatches an event (receive only)
    Dispatch,
    /// Keep the connection alive (send/receive)
    Heartbeat,
    /// Authenticate the session (send only)
    Identify,
    /// Update the client's presence status (send only)
    StatusUpdate,
    /// Join, move, or leave a voice channel (send only)
    VoiceStateUpdate,
    /// Resume a dropped session (send only)
    Resume,
    /// Server requests a reconnect (receive only)
    Reconnect,
    /// The session is invalid (receive only)
    InvalidSession,
    /// Sent immediately after connecting (receive only)
    Hello,
    /// Heartbeat acknowledged (receive only)
    HeartbeatAck,
    /// An op code this client version does not know
    Unknown(u8),
}

impl Opcode {
    /// Create an `Opcode` from a raw integer value
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Dispatch,
            1 => Self::Heartbeat,
            2 => Self::Identify,
            3 => Self::StatusUpdate,
            4 => Self::VoiceStateUpdate,
            6 => Self::Resume,
            7 => Self::Reconnect,
            9 => Self::InvalidSession,
            10 => Self::Hello,
            11 => Self::HeartbeatAck,
            other => Self::Unknown(other),
        }
    }

    /// Get the raw integer value
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::Dispatch => 0,
            Self::Heartbeat => 1,
            Self::Identify => 2,
            Self::StatusUpdate => 3,
            Self::VoiceStateUpdate => 4,
            Self::Resume => 6,
            Self::Reconnect => 7,
            Self::InvalidSession => 9,
            Self::Hello => 10,
            Self::HeartbeatAck => 11,
            Self::Unknown(v) => v,
        }
    }

    /// Check if this op code may be sent by the client
    #[must_use]
    pub const fn is_send(self) -> bool {
        matches!(
            self,
            Self::Heartbeat
                | Self::Identify
                | Self::StatusUpdate
                | Self::VoiceStateUpdate
                | Self::Resume
        )
    }

    /// Check if this op code may be received from the server
    #[must_use]
    pub const fn is_recv(self) -> bool {
        matches!(
            self,
            Self::Dispatch
                | Self::Heartbeat
                | Self::Reconnect
                | Self::InvalidSession
                | Self::Hello
                | Self::HeartbeatAck
        )
    }

    /// Get the name of this op code
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Dispatch => "Dispatch",
            Self::Heartbeat => "Heartbeat",
            Self::Identify => "Identify",
            Self::StatusUpdate => "StatusUpdate",
            Self::VoiceStateUpdate => "VoiceStateUpdate",
            Self::Resume => "Resume",
            Self::Reconnect => "Reconnect",
            Self::InvalidSession => "InvalidSession",
            Self::Hello => "Hello",
            Self::HeartbeatAck => "HeartbeatAck",
            Self::Unknown(_) => "Unknown",
        }
    }
}

impl Serialize for Opcode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Opcode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        Ok(Self::from_u8(value))
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_u8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_from_u8() {
        assert_eq!(Opcode::from_u8(0), Opcode::Dispatch);
        assert_eq!(Opcode::from_u8(1), Opcode::Heartbeat);
        assert_eq!(Opcode::from_u8(2), Opcode::Identify);
        assert_eq!(Opcode::from_u8(3), Opcode::StatusUpdate);
        assert_eq!(Opcode::from_u8(4), Opcode::VoiceStateUpdate);
        assert_eq!(Opcode::from_u8(6), Opcode::Resume);
        assert_eq!(Opcode::from_u8(7), Opcode::Reconnect);
        assert_eq!(Opcode::from_u8(9), Opcode::InvalidSession);
        assert_eq!(Opcode::from_u8(10), Opcode::Hello);
        assert_eq!(Opcode::from_u8(11), Opcode::HeartbeatAck);
    }

    #[test]
    fn test_unknown_opcode_roundtrips() {
        let op = Opcode::from_u8(42);
        assert_eq!(op, Opcode::Unknown(42));
        assert_eq!(op.as_u8(), 42);
        assert!(!op.is_send());
        assert!(!op.is_recv());
    }

    #[test]
    fn test_send_ops() {
        assert!(Opcode::Heartbeat.is_send());
        assert!(Opcode::Identify.is_send());
        assert!(Opcode::StatusUpdate.is_send());
        assert!(Opcode::VoiceStateUpdate.is_send());
        assert!(Opcode::Resume.is_send());
        assert!(!Opcode::Dispatch.is_send());
        assert!(!Opcode::Hello.is_send());
    }

    #[test]
    fn test_recv_ops() {
        assert!(Opcode::Dispatch.is_recv());
        assert!(Opcode::Heartbeat.is_recv());
        assert!(Opcode::Reconnect.is_recv());
        assert!(Opcode::InvalidSession.is_recv());
        assert!(Opcode::Hello.is_recv());
        assert!(Opcode::HeartbeatAck.is_recv());
        assert!(!Opcode::Identify.is_recv());
        assert!(!Opcode::Resume.is_recv());
    }

    #[test]
    fn test_opcode_serialization() {
        let json = serde_json::to_string(&Opcode::Hello).unwrap();
        assert_eq!(json, "10");

        let op: Opcode = serde_json::from_str("2").unwrap();
        assert_eq!(op, Opcode::Identify);

        let unknown: Opcode = serde_json::from_str("99").unwrap();
        assert_eq!(unknown, Opcode::Unknown(99));
    }

    #[test]
    fn test_opcode_display() {
        assert_eq!(format!("{}", Opcode::Hello), "Hello (10)");
        assert_eq!(format!("{}", Opcode::Dispatch), "Dispatch (0)");
    }
}
