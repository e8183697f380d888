//! Message entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Member, User};
use crate::maybe::Maybe;
use crate::value_objects::Snowflake;

/// A message posted in a text channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    /// Absent for direct messages
    #[serde(default, skip_serializing_if = "Maybe::is_missing")]
    pub guild_id: Maybe<Snowflake>,
    pub author: User,
    /// Partial member object, included for guild messages only
    #[serde(default, skip_serializing_if = "Maybe::is_missing")]
    pub member: Maybe<Member>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Maybe::is_missing")]
    pub timestamp: Maybe<DateTime<Utc>>,
    /// Null when the message was never edited
    #[serde(default, skip_serializing_if = "Maybe::is_missing")]
    pub edited_timestamp: Maybe<DateTime<Utc>>,
    #[serde(default)]
    pub mention_everyone: bool,
}

impl Message {
    /// True if the message was sent inside a guild
    pub fn is_guild_message(&self) -> bool {
        self.guild_id.is_value()
    }

    /// True if the message has been edited at least once
    pub fn is_edited(&self) -> bool {
        self.edited_timestamp.is_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_decode() {
        let msg: Message = serde_json::from_str(
            r#"{
                "id": "3",
                "channel_id": "2",
                "guild_id": "1",
                "author": {"id": "5", "username": "zip"},
                "content": "hello",
                "edited_timestamp": null
            }"#,
        )
        .unwrap();
        assert!(msg.is_guild_message());
        assert!(!msg.is_edited());
        assert_eq!(msg.edited_timestamp, Maybe::Null);
        assert_eq!(msg.content, "hello");
    }

    #[test]
    fn test_direct_message_has_no_guild() {
        let msg: Message = serde_json::from_str(
            r#"{"id": "3", "channel_id": "2", "author": {"id": "5", "username": "zip"}}"#,
        )
        .unwrap();
        assert!(!msg.is_guild_message());
        assert!(msg.guild_id.is_missing());
    }
}
