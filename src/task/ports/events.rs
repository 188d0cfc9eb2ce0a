//! Change event bus port.
//!
//! The bus fans store writes out to every subscribed client. Delivery is
//! at-least-once with no ordering guarantee across distinct records.

use crate::task::domain::{Task, TaskAssignee, TaskId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Result type for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Shared collections clients can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    /// Task records.
    Tasks,
    /// Task assignment rows.
    TaskAssignees,
}

impl Collection {
    /// Both collections, in subscription order.
    pub const ALL: [Self; 2] = [Self::Tasks, Self::TaskAssignees];

    /// Returns the collection name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tasks => "tasks",
            Self::TaskAssignees => "task_assignees",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Kind of change carried by an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOperation {
    /// A record was inserted.
    Insert,
    /// A record was updated.
    Update,
    /// A record was deleted.
    Delete,
}

/// Record payload of a change event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "collection", content = "record", rename_all = "snake_case")]
pub enum ChangeRecord {
    /// A task record.
    Tasks(Task),
    /// An assignment row.
    TaskAssignees(TaskAssignee),
}

impl ChangeRecord {
    /// Returns the collection the record belongs to.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        match self {
            Self::Tasks(_) => Collection::Tasks,
            Self::TaskAssignees(_) => Collection::TaskAssignees,
        }
    }

    /// Returns the task the record concerns.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        match self {
            Self::Tasks(task) => task.id(),
            Self::TaskAssignees(row) => row.task_id,
        }
    }
}

/// A single insert, update or delete notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Kind of change.
    pub operation: ChangeOperation,
    /// Record state after the change (before it, for deletes).
    pub record: ChangeRecord,
    /// When the store committed the change.
    pub committed_at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Creates a change event.
    #[must_use]
    pub const fn new(
        operation: ChangeOperation,
        record: ChangeRecord,
        committed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            operation,
            record,
            committed_at,
        }
    }
}

/// Live subscription to one collection.
///
/// The subscription has ended when [`ChangeSubscription::next`] returns
/// `None`; callers resubscribe to resume.
#[derive(Debug)]
pub struct ChangeSubscription {
    collection: Collection,
    receiver: mpsc::UnboundedReceiver<ChangeEvent>,
}

impl ChangeSubscription {
    /// Wraps a receiver fed by the bus.
    #[must_use]
    pub const fn new(
        collection: Collection,
        receiver: mpsc::UnboundedReceiver<ChangeEvent>,
    ) -> Self {
        Self {
            collection,
            receiver,
        }
    }

    /// Returns the subscribed collection.
    #[must_use]
    pub const fn collection(&self) -> Collection {
        self.collection
    }

    /// Waits for the next event. Returns `None` once the subscription drops.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }
}

/// Subscription side of the change event bus.
#[async_trait]
pub trait ChangeEventBus: Send + Sync {
    /// Opens a subscription to a collection.
    ///
    /// # Errors
    ///
    /// Returns [`EventBusError::Unavailable`] when the bus cannot be reached.
    async fn subscribe(&self, collection: Collection) -> EventBusResult<ChangeSubscription>;
}

/// Errors returned by change event bus adapters.
#[derive(Debug, Clone, Error)]
pub enum EventBusError {
    /// The bus refused or could not accept the subscription.
    #[error("change event bus unavailable for {collection}: {reason}")]
    Unavailable {
        /// Requested collection.
        collection: Collection,
        /// Reason string.
        reason: String,
    },

    /// Transport failure.
    #[error("change event bus transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),
}

impl EventBusError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
