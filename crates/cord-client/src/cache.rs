//! Shared domain-state cache
//!
//! Mutated by middleware transforms as events arrive and read by user
//! handlers and convenience queries, so every collection sits behind its
//! own lock. Reads hand out clones; no lock is held across user code.

use cord_core::{Guild, Member, Role, Snowflake, User};
use parking_lot::RwLock;
use std::collections::HashMap;

/// Client-lifetime cache of domain state
#[derive(Debug, Default)]
pub struct Cache {
    current_user: RwLock<Option<User>>,
    guilds: RwLock<HashMap<Snowflake, Guild>>,
}

impl Cache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The bot account the session authenticated as
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.current_user.read().clone()
    }

    pub fn set_current_user(&self, user: User) {
        *self.current_user.write() = Some(user);
    }

    /// Look up a guild by id
    #[must_use]
    pub fn guild(&self, id: Snowflake) -> Option<Guild> {
        self.guilds.read().get(&id).cloned()
    }

    #[must_use]
    pub fn guild_count(&self) -> usize {
        self.guilds.read().len()
    }

    /// Insert or replace a guild
    pub fn insert_guild(&self, guild: Guild) {
        self.guilds.write().insert(guild.id, guild);
    }

    pub fn remove_guild(&self, id: Snowflake) -> Option<Guild> {
        self.guilds.write().remove(&id)
    }

    /// Replace a role in the cached guild, matched by role id.
    ///
    /// A guild absent from the cache is a no-op, not an error: events can
    /// arrive for guilds the cache has not seen yet.
    pub fn replace_role(&self, guild_id: Snowflake, role: Role) -> bool {
        match self.guilds.write().get_mut(&guild_id) {
            Some(guild) => guild.replace_role(role),
            None => false,
        }
    }

    /// Add or replace a member in the cached guild
    pub fn upsert_member(&self, guild_id: Snowflake, member: Member) -> bool {
        match self.guilds.write().get_mut(&guild_id) {
            Some(guild) => {
                guild.upsert_member(member);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild(id: u64, role_name: &str) -> Guild {
        serde_json::from_value(serde_json::json!({
            "id": id.to_string(),
            "name": "g",
            "roles": [{"id": "9", "name": role_name}]
        }))
        .unwrap()
    }

    #[test]
    fn test_replace_role_in_cached_guild() {
        let cache = Cache::new();
        cache.insert_guild(guild(1, "old"));

        let updated: Role = serde_json::from_str(r#"{"id": "9", "name": "new"}"#).unwrap();
        assert!(cache.replace_role(Snowflake::new(1), updated));
        assert_eq!(
            cache.guild(Snowflake::new(1)).unwrap().roles[0].name,
            "new"
        );
    }

    #[test]
    fn test_replace_role_missing_guild_is_noop() {
        let cache = Cache::new();
        let role: Role = serde_json::from_str(r#"{"id": "9", "name": "new"}"#).unwrap();
        assert!(!cache.replace_role(Snowflake::new(404), role));
        assert_eq!(cache.guild_count(), 0);
    }

    #[test]
    fn test_guild_insert_and_remove() {
        let cache = Cache::new();
        cache.insert_guild(guild(1, "r"));
        cache.insert_guild(guild(2, "r"));
        assert_eq!(cache.guild_count(), 2);

        assert!(cache.remove_guild(Snowflake::new(1)).is_some());
        assert!(cache.guild(Snowflake::new(1)).is_none());
        assert_eq!(cache.guild_count(), 1);
    }
}
