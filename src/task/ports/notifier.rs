//! Outbound notification intents for assignees.
//!
//! The collaborator behind this port filters by preference, delivers push
//! messages and persists in-app notification rows. The core only states who
//! should hear about what.

use crate::task::domain::{DriverId, TaskId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Result type for notification operations.
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Event that triggered a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEventType {
    /// A task was created with assignees.
    TaskAssigned,
    /// The lead driver of a task changed.
    TaskReassigned,
    /// Fields of an assigned task changed.
    TaskUpdated,
}

/// Request to notify recipients about a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationIntent {
    /// Triggering event.
    pub event_type: NotificationEventType,
    /// Concerned task.
    pub task_id: TaskId,
    /// Drivers to notify.
    pub recipients: Vec<DriverId>,
    /// Event-specific payload.
    pub payload: Value,
}

/// Sink for notification intents.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Hands an intent to the notification collaborator.
    async fn emit(&self, intent: NotificationIntent) -> NotificationResult<()>;
}

/// Errors returned by notification sinks.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    /// Delivery hand-off failed.
    #[error("notification hand-off failed: {0}")]
    Delivery(Arc<dyn std::error::Error + Send + Sync>),
}

impl NotificationError {
    /// Wraps a delivery error.
    pub fn delivery(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Delivery(Arc::new(err))
    }
}
