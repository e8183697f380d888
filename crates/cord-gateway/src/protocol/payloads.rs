//! Control frame payloads
//!
//! Payload structures for the client-to-server control frames.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Payload of op 10 (Hello), sent by the server immediately after connect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

bitflags::bitflags! {
    /// Gateway intents: capability flags declaring which event groups the
    /// session wants to receive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Intents: u64 {
        const GUILDS                  = 1 << 0;
        const GUILD_MEMBERS           = 1 << 1;
        const GUILD_BANS              = 1 << 2;
        const GUILD_EMOJIS            = 1 << 3;
        const GUILD_VOICE_STATES      = 1 << 7;
        const GUILD_PRESENCES         = 1 << 8;
        const GUILD_MESSAGES          = 1 << 9;
        const GUILD_MESSAGE_REACTIONS = 1 << 10;
        const GUILD_MESSAGE_TYPING    = 1 << 11;
        const DIRECT_MESSAGES         = 1 << 12;
    }
}

impl Default for Intents {
    /// Non-privileged defaults: guilds and message traffic
    fn default() -> Self {
        Self::GUILDS | Self::GUILD_MESSAGES | Self::DIRECT_MESSAGES
    }
}

impl Serialize for Intents {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.bits())
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Self::from_bits_truncate(u64::deserialize(deserializer)?))
    }
}

/// Payload of op 2 (Identify): authenticate a fresh session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identify {
    /// Bot authentication token
    pub token: String,

    /// Client connection properties
    pub properties: ConnectionProperties,

    /// Capability flags
    pub intents: Intents,

    /// Shard pair: [index, count]
    pub shard: [u32; 2],
}

/// Client connection properties sent with Identify
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            browser: "cord".to_string(),
            device: "cord".to_string(),
        }
    }
}

/// Payload of op 6 (Resume): reattach to a prior session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    /// Bot authentication token
    pub token: String,

    /// Session ID issued in the READY payload
    pub session_id: String,

    /// Last received sequence number
    pub seq: u64,
}

/// Payload of op 3 (StatusUpdate): update the client's presence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// New status (online, idle, dnd, offline)
    pub status: String,
}

impl StatusUpdate {
    /// Valid status values
    pub const VALID_STATUSES: &'static [&'static str] = &["online", "idle", "dnd", "offline"];

    /// Check if the status is valid
    #[must_use]
    pub fn is_valid_status(&self) -> bool {
        Self::VALID_STATUSES.contains(&self.status.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intents_serialize_as_bits() {
        let intents = Intents::GUILDS | Intents::GUILD_MESSAGES;
        let json = serde_json::to_string(&intents).unwrap();
        assert_eq!(json, "513");

        let back: Intents = serde_json::from_str("513").unwrap();
        assert_eq!(back, intents);
    }

    #[test]
    fn test_identify_serialization() {
        let payload = Identify {
            token: "token123".to_string(),
            properties: ConnectionProperties::default(),
            intents: Intents::default(),
            shard: [0, 1],
        };

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["token"], "token123");
        assert_eq!(json["shard"], serde_json::json!([0, 1]));
        assert!(json["intents"].is_u64());
    }

    #[test]
    fn test_resume_serialization() {
        let payload = Resume {
            token: "token123".to_string(),
            session_id: "session456".to_string(),
            seq: 42,
        };

        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("session456"));
        assert!(json.contains("42"));
    }

    #[test]
    fn test_status_update_validation() {
        let valid = StatusUpdate { status: "online".to_string() };
        assert!(valid.is_valid_status());

        let invalid = StatusUpdate { status: "busy".to_string() };
        assert!(!invalid.is_valid_status());
    }
}
