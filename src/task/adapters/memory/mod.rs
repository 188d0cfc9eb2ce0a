//! In-memory adapters for the task store, change event bus, actor directory
//! and notification sink.

mod directory;
mod event_bus;
mod notifier;
mod store;

pub use directory::StaticActorDirectory;
pub use event_bus::InMemoryChangeEventBus;
pub use notifier::RecordingNotificationSink;
pub use store::{InMemoryTaskStore, StoreCall};
