//! Permission bitflags
//!
//! The wire encodes role permissions as a stringified 64-bit integer.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags::bitflags! {
    /// Permission flags granted by a role
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Permissions: u64 {
        const CREATE_INVITE      = 1 << 0;
        const KICK_MEMBERS       = 1 << 1;
        const BAN_MEMBERS        = 1 << 2;
        const ADMINISTRATOR      = 1 << 3;
        const MANAGE_CHANNELS    = 1 << 4;
        const MANAGE_GUILD       = 1 << 5;
        const ADD_REACTIONS      = 1 << 6;
        const VIEW_CHANNEL       = 1 << 10;
        const SEND_MESSAGES      = 1 << 11;
        const MANAGE_MESSAGES    = 1 << 13;
        const EMBED_LINKS        = 1 << 14;
        const ATTACH_FILES       = 1 << 15;
        const READ_HISTORY       = 1 << 16;
        const MENTION_EVERYONE   = 1 << 17;
        const MANAGE_ROLES       = 1 << 28;
    }
}

impl Permissions {
    /// Check whether all bits of `other` are set, honoring ADMINISTRATOR
    pub fn has(self, other: Permissions) -> bool {
        self.contains(Self::ADMINISTRATOR) || self.contains(other)
    }
}

impl Serialize for Permissions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.bits().to_string())
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        let bits = raw
            .parse::<u64>()
            .map_err(|_| serde::de::Error::custom("invalid permission bits"))?;
        Ok(Self::from_bits_truncate(bits))
    }
}
