//! Typed gateway events
//!
//! Each variant is the decoded payload of one dispatch event, produced by
//! the client's middleware transforms. The set here is representative;
//! the remote service defines many more, and adding one is a new variant
//! plus a transform entry.

use serde::{Deserialize, Serialize};

use crate::entities::{Guild, Member, Message, Role, User};
use crate::value_objects::Snowflake;

/// A typed event delivered to user handlers
#[derive(Debug, Clone)]
pub enum Event {
    /// The session completed identifying
    Ready(ReadyEvent),
    /// The session resumed after a transient disconnect
    Resumed,
    /// Guild became available, was joined, or was created
    GuildCreate(Box<Guild>),
    /// Guild became unavailable or the client was removed from it
    GuildDelete(GuildDeleteEvent),
    /// A guild role changed
    GuildRoleUpdate(GuildRoleUpdateEvent),
    /// A user joined a guild
    GuildMemberAdd(GuildMemberAddEvent),
    /// A message was posted in a subscribed channel
    MessageCreate(Box<Message>),
}

/// Payload of the READY dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// Gateway protocol version
    pub v: u8,
    pub session_id: String,
    /// The bot account this session authenticated as
    pub user: User,
    /// Unavailable guild stubs; full objects follow as GUILD_CREATE
    #[serde(default)]
    pub guilds: Vec<Guild>,
    /// Shard pair [index, count] echoed back by the server
    #[serde(default)]
    pub shard: Option<[u32; 2]>,
}

/// Payload of the GUILD_DELETE dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildDeleteEvent {
    pub id: Snowflake,
    /// True when the guild went down temporarily; absent when kicked
    #[serde(default)]
    pub unavailable: bool,
}

/// Payload of the GUILD_ROLE_UPDATE dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildRoleUpdateEvent {
    pub guild_id: Snowflake,
    pub role: Role,
}

/// Payload of the GUILD_MEMBER_ADD dispatch: a member object with an
/// extra `guild_id` key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMemberAddEvent {
    pub guild_id: Snowflake,
    #[serde(flatten)]
    pub member: Member,
}
