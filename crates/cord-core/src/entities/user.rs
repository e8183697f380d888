//! User entity

use serde::{Deserialize, Serialize};

use crate::maybe::Maybe;
use crate::value_objects::Snowflake;

/// A platform user account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub username: String,
    #[serde(default)]
    pub discriminator: Option<String>,
    /// Avatar hash; null means the user has no custom avatar
    #[serde(default, skip_serializing_if = "Maybe::is_missing")]
    pub avatar: Maybe<String>,
    #[serde(default, skip_serializing_if = "Maybe::is_missing")]
    pub bot: Maybe<bool>,
}

impl User {
    /// True if this account is a bot user
    pub fn is_bot(&self) -> bool {
        self.bot.value().copied().unwrap_or(false)
    }

    /// Avatar CDN path, if the user has a custom avatar
    pub fn avatar_url(&self) -> Option<String> {
        self.avatar
            .value()
            .map(|hash| format!("/avatars/{}/{hash}.png", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_decode_minimal() {
        let user: User =
            serde_json::from_str(r#"{"id": "1", "username": "zip"}"#).unwrap();
        assert_eq!(user.username, "zip");
        assert!(user.avatar.is_missing());
        assert!(!user.is_bot());
    }

    #[test]
    fn test_user_avatar_url() {
        let user: User = serde_json::from_str(
            r#"{"id": "7", "username": "zip", "avatar": "abc", "bot": true}"#,
        )
        .unwrap();
        assert_eq!(user.avatar_url(), Some("/avatars/7/abc.png".to_string()));
        assert!(user.is_bot());
    }
}
