//! Guild entity - a server the client is a member of

use serde::{Deserialize, Serialize};

use crate::entities::{Member, Role};
use crate::maybe::Maybe;
use crate::value_objects::Snowflake;

/// Guild (server) entity
///
/// The READY payload carries unavailable stubs (`id` + `unavailable`);
/// the full object arrives in a later GUILD_CREATE dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guild {
    pub id: Snowflake,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Maybe::is_missing")]
    pub icon: Maybe<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Snowflake>,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub members: Vec<Member>,
    #[serde(default)]
    pub member_count: Option<u64>,
    #[serde(default)]
    pub unavailable: bool,
}

impl Guild {
    /// Check if a user is the guild owner
    #[inline]
    pub fn is_owner(&self, user_id: Snowflake) -> bool {
        self.owner_id == Some(user_id)
    }

    /// Look up a role by id
    pub fn role(&self, role_id: Snowflake) -> Option<&Role> {
        self.roles.iter().find(|r| r.id == role_id)
    }

    /// Replace the role with the same id, if present.
    ///
    /// Returns true when a matching role was replaced.
    pub fn replace_role(&mut self, role: Role) -> bool {
        match self.roles.iter_mut().find(|r| r.id == role.id) {
            Some(slot) => {
                *slot = role;
                true
            }
            None => false,
        }
    }

    /// Look up a member by user id
    pub fn member(&self, user_id: Snowflake) -> Option<&Member> {
        self.members.iter().find(|m| m.user_id() == Some(user_id))
    }

    /// Add or replace a member keyed by user id
    pub fn upsert_member(&mut self, member: Member) {
        if let Some(user_id) = member.user_id() {
            if let Some(slot) = self
                .members
                .iter_mut()
                .find(|m| m.user_id() == Some(user_id))
            {
                *slot = member;
                return;
            }
        }
        self.members.push(member);
    }

    /// Get the guild icon URL if set
    pub fn icon_url(&self) -> Option<String> {
        self.icon
            .value()
            .map(|hash| format!("/icons/{}/{hash}.png", self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild_with_role(name: &str) -> Guild {
        serde_json::from_value(serde_json::json!({
            "id": "1",
            "name": "test",
            "owner_id": "100",
            "roles": [{"id": "9", "name": name}]
        }))
        .unwrap()
    }

    #[test]
    fn test_guild_ownership() {
        let guild = guild_with_role("old");
        assert!(guild.is_owner(Snowflake::new(100)));
        assert!(!guild.is_owner(Snowflake::new(200)));
    }

    #[test]
    fn test_replace_role_by_identity() {
        let mut guild = guild_with_role("old");
        let updated: Role =
            serde_json::from_str(r#"{"id": "9", "name": "new"}"#).unwrap();

        assert!(guild.replace_role(updated));
        assert_eq!(guild.role(Snowflake::new(9)).unwrap().name, "new");

        // Unknown role id is not inserted
        let stranger: Role =
            serde_json::from_str(r#"{"id": "77", "name": "x"}"#).unwrap();
        assert!(!guild.replace_role(stranger));
        assert_eq!(guild.roles.len(), 1);
    }

    #[test]
    fn test_unavailable_stub_decodes() {
        let stub: Guild =
            serde_json::from_str(r#"{"id": "3", "unavailable": true}"#).unwrap();
        assert!(stub.unavailable);
        assert!(stub.roles.is_empty());
    }

    #[test]
    fn test_upsert_member() {
        let mut guild = guild_with_role("old");
        let member: Member = serde_json::from_str(
            r#"{"user": {"id": "5", "username": "zip"}, "roles": []}"#,
        )
        .unwrap();
        guild.upsert_member(member.clone());
        guild.upsert_member(member);
        assert_eq!(guild.members.len(), 1);
        assert!(guild.member(Snowflake::new(5)).is_some());
    }
}
