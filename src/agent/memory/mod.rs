//! Session state for one logical conversation
//!
//! A [`Session`] owns the result cache and the entity context store. It is
//! constructed explicitly and injected into the orchestration loop; nothing
//! here is ambient process state. The HTTP layer currently owns a single
//! Session; a multi-conversation deployment keys Sessions by conversation
//! id and hands each loop its own.

mod cache;
mod context;

pub use cache::{cache_key, ResultCache};
pub use context::{EntityContextStore, EntityRecord};

use std::time::Duration;

pub struct Session {
    pub cache: ResultCache,
    pub context: EntityContextStore,
}

impl Session {
    pub fn new(cache_ttl: Duration) -> Self {
        Self {
            cache: ResultCache::new(cache_ttl),
            context: EntityContextStore::new(),
        }
    }

    /// Start fresh: drops all remembered entities and cached results.
    pub async fn reset(&self) {
        self.context.reset().await;
        self.cache.clear().await;
    }
}
