//! Port contracts for the task store and its collaborators.
//!
//! Ports define infrastructure-agnostic interfaces used by client services.

pub mod directory;
pub mod events;
pub mod notifier;
pub mod store;

pub use directory::ActorDirectory;
pub use events::{
    ChangeEvent, ChangeEventBus, ChangeOperation, ChangeRecord, ChangeSubscription, Collection,
    EventBusError, EventBusResult,
};
pub use notifier::{
    NotificationError, NotificationEventType, NotificationIntent, NotificationResult,
    NotificationSink,
};
pub use store::{
    INVALID_STATUS_FLOW, STORE_ERROR, StatusExtras, TaskStore, TaskStoreError, TaskStoreResult,
};
