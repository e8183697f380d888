//! The standard middleware transforms
//!
//! One function per wire event. Each decodes the payload into its typed
//! form, applies the documented cache side effect, and returns the
//! internal event name its handlers are registered under.

use crate::context::ClientContext;
use crate::error::MiddlewareError;
use cord_core::events::{GuildDeleteEvent, GuildMemberAddEvent, GuildRoleUpdateEvent, ReadyEvent};
use cord_core::{decode, Event, Guild, Message};
use cord_gateway::Envelope;

type TransformResult = Result<(&'static str, Event), MiddlewareError>;

/// READY: record the bot user and the unavailable guild stubs
pub fn ready(ctx: &ClientContext, envelope: &Envelope) -> TransformResult {
    let event: ReadyEvent = decode(&envelope.d)?;
    ctx.cache().set_current_user(event.user.clone());
    for guild in &event.guilds {
        ctx.cache().insert_guild(guild.clone());
    }
    Ok(("on_ready", Event::Ready(event)))
}

/// RESUMED: no payload, no side effect
pub fn resumed(_ctx: &ClientContext, _envelope: &Envelope) -> TransformResult {
    Ok(("on_resumed", Event::Resumed))
}

/// GUILD_CREATE: the full guild object replaces any cached stub
pub fn guild_create(ctx: &ClientContext, envelope: &Envelope) -> TransformResult {
    let guild: Guild = decode(&envelope.d)?;
    ctx.cache().insert_guild(guild.clone());
    Ok(("on_guild_create", Event::GuildCreate(Box::new(guild))))
}

/// GUILD_DELETE: evict the guild from the cache
pub fn guild_delete(ctx: &ClientContext, envelope: &Envelope) -> TransformResult {
    let event: GuildDeleteEvent = decode(&envelope.d)?;
    ctx.cache().remove_guild(event.id);
    Ok(("on_guild_delete", Event::GuildDelete(event)))
}

/// GUILD_ROLE_UPDATE: replace the role in the cached guild by role id;
/// an uncached guild leaves the cache untouched.
pub fn guild_role_update(ctx: &ClientContext, envelope: &Envelope) -> TransformResult {
    let event: GuildRoleUpdateEvent = decode(&envelope.d)?;
    ctx.cache().replace_role(event.guild_id, event.role.clone());
    Ok(("on_guild_role_update", Event::GuildRoleUpdate(event)))
}

/// GUILD_MEMBER_ADD: record the member on the cached guild
pub fn guild_member_add(ctx: &ClientContext, envelope: &Envelope) -> TransformResult {
    let event: GuildMemberAddEvent = decode(&envelope.d)?;
    ctx.cache().upsert_member(event.guild_id, event.member.clone());
    Ok(("on_guild_member_add", Event::GuildMemberAdd(event)))
}

/// MESSAGE_CREATE: pure decode, no cache side effect
pub fn message_create(_ctx: &ClientContext, envelope: &Envelope) -> TransformResult {
    let message: Message = decode(&envelope.d)?;
    Ok(("on_message", Event::MessageCreate(Box::new(message))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use cord_core::Snowflake;
    use serde_json::json;
    use std::sync::Arc;

    fn context() -> ClientContext {
        ClientContext::new(Arc::new(Cache::new()))
    }

    #[test]
    fn test_role_update_replaces_cached_role() {
        let ctx = context();
        ctx.cache().insert_guild(
            serde_json::from_value(json!({
                "id": "1",
                "name": "g",
                "roles": [{"id": "9", "name": "old"}]
            }))
            .unwrap(),
        );

        let envelope = Envelope::dispatch(
            "GUILD_ROLE_UPDATE",
            5,
            json!({"guild_id": "1", "role": {"id": "9", "name": "new"}}),
        );
        let (name, event) = guild_role_update(&ctx, &envelope).unwrap();

        assert_eq!(name, "on_guild_role_update");
        match event {
            Event::GuildRoleUpdate(update) => assert_eq!(update.role.name, "new"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(
            ctx.cache().guild(Snowflake::new(1)).unwrap().roles[0].name,
            "new"
        );
    }

    #[test]
    fn test_role_update_uncached_guild_still_emits() {
        let ctx = context();
        let envelope = Envelope::dispatch(
            "GUILD_ROLE_UPDATE",
            5,
            json!({"guild_id": "404", "role": {"id": "9", "name": "new"}}),
        );

        let (name, _event) = guild_role_update(&ctx, &envelope).unwrap();
        assert_eq!(name, "on_guild_role_update");
        assert_eq!(ctx.cache().guild_count(), 0);
    }

    #[test]
    fn test_ready_records_user_and_stubs() {
        let ctx = context();
        let envelope = Envelope::dispatch(
            "READY",
            1,
            json!({
                "v": 9,
                "session_id": "abc",
                "user": {"id": "100", "username": "bot"},
                "guilds": [{"id": "2", "unavailable": true}]
            }),
        );

        let (name, _event) = ready(&ctx, &envelope).unwrap();
        assert_eq!(name, "on_ready");
        assert_eq!(ctx.cache().current_user().unwrap().username, "bot");
        assert!(ctx.cache().guild(Snowflake::new(2)).unwrap().unavailable);
    }

    #[test]
    fn test_message_create_decode_failure() {
        let ctx = context();
        let envelope = Envelope::dispatch("MESSAGE_CREATE", 1, json!({"id": 3.5}));
        assert!(matches!(
            message_create(&ctx, &envelope),
            Err(MiddlewareError::Decode(_))
        ));
    }
}
