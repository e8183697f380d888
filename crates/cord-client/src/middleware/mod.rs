//! Middleware registry
//!
//! Maps a wire event name to the transform that decodes it into a typed
//! event and applies its cache side effect. The table is built once at
//! client construction and read-only afterwards; a wire event with no
//! entry is dropped silently so unknown event types never break dispatch.

mod transforms;

use crate::context::ClientContext;
use crate::error::MiddlewareError;
use cord_core::Event;
use cord_gateway::Envelope;
use std::collections::HashMap;

/// A middleware transform: decode the envelope payload, apply any cache
/// side effect, and name the internal event handlers subscribe to.
pub type Transform =
    fn(&ClientContext, &Envelope) -> Result<(&'static str, Event), MiddlewareError>;

/// Wire event name -> transform table
pub struct MiddlewareRegistry {
    table: HashMap<&'static str, Transform>,
}

impl MiddlewareRegistry {
    /// The standard table covering the supported dispatch events
    #[must_use]
    pub fn standard() -> Self {
        let mut table: HashMap<&'static str, Transform> = HashMap::new();
        table.insert("READY", transforms::ready);
        table.insert("RESUMED", transforms::resumed);
        table.insert("GUILD_CREATE", transforms::guild_create);
        table.insert("GUILD_DELETE", transforms::guild_delete);
        table.insert("GUILD_ROLE_UPDATE", transforms::guild_role_update);
        table.insert("GUILD_MEMBER_ADD", transforms::guild_member_add);
        table.insert("MESSAGE_CREATE", transforms::message_create);
        Self { table }
    }

    /// Look up the transform for a wire event name
    #[must_use]
    pub fn get(&self, wire_event: &str) -> Option<Transform> {
        self.table.get(wire_event).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for MiddlewareRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
