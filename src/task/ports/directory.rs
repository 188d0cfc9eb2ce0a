//! Actor directory port.

use crate::task::domain::ActorId;
use async_trait::async_trait;

/// Resolves actors to human-readable names.
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    /// Returns the display name of an actor, or `None` when unknown.
    async fn display_name(&self, actor: ActorId) -> Option<String>;
}
