//! Guild member entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::User;
use crate::maybe::Maybe;
use crate::value_objects::Snowflake;

/// A user's membership in a guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    #[serde(default, skip_serializing_if = "Maybe::is_missing")]
    pub user: Maybe<User>,
    /// Guild-specific nickname; null means explicitly cleared
    #[serde(default, skip_serializing_if = "Maybe::is_missing")]
    pub nick: Maybe<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    #[serde(default, skip_serializing_if = "Maybe::is_missing")]
    pub joined_at: Maybe<DateTime<Utc>>,
}

impl Member {
    /// The member's user id, when the user object was included
    pub fn user_id(&self) -> Option<Snowflake> {
        self.user.value().map(|u| u.id)
    }

    /// Display name: nickname if set, else username
    pub fn display_name(&self) -> Option<&str> {
        self.nick
            .value()
            .map(String::as_str)
            .or_else(|| self.user.value().map(|u| u.username.as_str()))
    }

    /// Check membership of a role by id
    pub fn has_role(&self, role_id: Snowflake) -> bool {
        self.roles.contains(&role_id)
    }
}
