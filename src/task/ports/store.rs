//! Store port for the authoritative task records.

use crate::task::domain::{
    ActorId, AuditRecord, DriverId, NewTask, Task, TaskAssignee, TaskDomainError, TaskId,
    TaskPatch, TaskStatus,
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Result type for task store operations.
pub type TaskStoreResult<T> = Result<T, TaskStoreError>;

/// Extra fields stored alongside a status change.
pub type StatusExtras = Map<String, Value>;

/// Error code reported for a rejected move into `completed`.
pub const INVALID_STATUS_FLOW: &str = "INVALID_STATUS_FLOW";

/// Error code reported for every other store failure.
pub const STORE_ERROR: &str = "STORE_ERROR";

/// Authoritative task store contract.
///
/// Every write stamps the task's revision, writer and write time, appends an
/// [`AuditRecord`], and publishes the resulting change on the change event
/// bus.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Returns every task that has not been soft-deleted.
    async fn list_tasks(&self) -> TaskStoreResult<Vec<Task>>;

    /// Returns every assignment row.
    async fn list_assignees(&self) -> TaskStoreResult<Vec<TaskAssignee>>;

    /// Finds a task by identifier, including soft-deleted tasks.
    ///
    /// Returns `None` when the task does not exist.
    async fn find_task(&self, id: TaskId) -> TaskStoreResult<Option<Task>>;

    /// Returns the audit trail of a task, oldest first.
    async fn audit_trail(&self, id: TaskId) -> TaskStoreResult<Vec<AuditRecord>>;

    /// Creates a task with an optional lead and helper drivers.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Domain`] when a co-driver is also the lead.
    async fn create_task(
        &self,
        draft: NewTask,
        lead: Option<DriverId>,
        co_drivers: &[DriverId],
        actor: ActorId,
    ) -> TaskStoreResult<Task>;

    /// Overwrites the fields present in `patch`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    async fn update_task(
        &self,
        id: TaskId,
        patch: &TaskPatch,
        actor: ActorId,
    ) -> TaskStoreResult<Task>;

    /// Moves a task to `next`, storing `extras` with the change.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::InvalidStatusFlow`] when `next` is
    /// `completed` and the stored status is not `in_progress`.
    async fn update_task_status(
        &self,
        id: TaskId,
        next: TaskStatus,
        actor: ActorId,
        extras: &StatusExtras,
    ) -> TaskStoreResult<()>;

    /// Replaces the lead assignment of a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    async fn reassign_lead(
        &self,
        task_id: TaskId,
        driver_id: DriverId,
        actor: ActorId,
    ) -> TaskStoreResult<()>;

    /// Sets the soft-delete marker; the row is kept.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::NotFound`] when the task does not exist.
    async fn soft_delete_task(&self, id: TaskId, actor: ActorId) -> TaskStoreResult<()>;
}

/// Errors returned by task store implementations.
#[derive(Debug, Clone, Error)]
pub enum TaskStoreError {
    /// A move into `completed` was attempted from a status other than
    /// `in_progress`.
    #[error("task {task_id} cannot move from {from} to {to}")]
    InvalidStatusFlow {
        /// Task identifier.
        task_id: TaskId,
        /// Stored status at the time of the request.
        from: TaskStatus,
        /// Requested status.
        to: TaskStatus,
    },

    /// The task was not found.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The task has been soft-deleted and no longer accepts writes.
    #[error("task {0} has been deleted")]
    Deleted(TaskId),

    /// The request failed domain validation.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// Persistence or transport failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl TaskStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }

    /// Returns the distinguishable error code of this failure.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidStatusFlow { .. } => INVALID_STATUS_FLOW,
            _ => STORE_ERROR,
        }
    }
}
