//! Fixed actor directory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::task::{domain::ActorId, ports::ActorDirectory};

/// Actor directory backed by a map.
#[derive(Debug, Clone, Default)]
pub struct StaticActorDirectory {
    names: Arc<RwLock<HashMap<ActorId, String>>>,
}

impl StaticActorDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an actor's display name.
    #[must_use]
    pub fn with_actor(self, actor: ActorId, name: impl Into<String>) -> Self {
        if let Ok(mut names) = self.names.write() {
            names.insert(actor, name.into());
        }
        self
    }
}

#[async_trait]
impl ActorDirectory for StaticActorDirectory {
    async fn display_name(&self, actor: ActorId) -> Option<String> {
        self.names
            .read()
            .ok()
            .and_then(|names| names.get(&actor).cloned())
    }
}
