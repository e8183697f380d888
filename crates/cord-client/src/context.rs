//! Client context handed to middleware transforms
//!
//! Carries the shared state a transform is allowed to touch. Kept
//! deliberately small: transforms decode payloads and update the cache,
//! nothing else.

use crate::cache::Cache;
use std::sync::Arc;

/// Shared state visible to middleware transforms
#[derive(Clone)]
pub struct ClientContext {
    cache: Arc<Cache>,
}

impl ClientContext {
    #[must_use]
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    /// The shared domain-state cache
    #[must_use]
    pub fn cache(&self) -> &Cache {
        &self.cache
    }
}
