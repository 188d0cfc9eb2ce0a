//! Failures surfaced by the client synchronization engine.

use super::MutationLane;
use crate::task::{
    domain::{TaskId, TaskStatus},
    ports::TaskStoreError,
};
use crate::workflow::{
    domain::{WorkflowDomainError, WorkflowSessionId},
    ports::WorkflowPersistenceError,
};
use thiserror::Error;

/// Result type for client operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors returned by client operations.
///
/// Store and workflow failures are converted into these variants at the
/// mutation boundary; every variant that follows a user gesture also queues a
/// notice on the board.
#[derive(Debug, Clone, Error)]
pub enum SyncError {
    /// The task is not on the board.
    #[error("task {0} is not on the board")]
    UnknownTask(TaskId),

    /// A mutation on the same task and control is still in flight.
    #[error("a {lane} change to task {task_id} is still in flight")]
    Busy {
        /// Target task.
        task_id: TaskId,
        /// Occupied control.
        lane: MutationLane,
    },

    /// The store rejected completion because the task was not in progress.
    #[error("task {task_id} must be in progress before it can be completed (was {from})")]
    GuardedTransition {
        /// Target task.
        task_id: TaskId,
        /// Stored status at rejection time.
        from: TaskStatus,
    },

    /// A single write failed and the optimistic change was rolled back.
    #[error("{operation} failed for task {task_id}: {source}")]
    WriteFailed {
        /// Target task.
        task_id: TaskId,
        /// Store operation name.
        operation: &'static str,
        /// Store failure.
        #[source]
        source: TaskStoreError,
    },

    /// At least one member of a bulk operation failed and the whole batch was
    /// rolled back.
    #[error("{failed} of {total} bulk writes failed")]
    PartialBulkFailure {
        /// Number of failed writes.
        failed: usize,
        /// Number of attempted writes.
        total: usize,
        /// Number of tasks put back to their pre-batch state. Tasks the
        /// server changed in the meantime keep the newer state.
        restored: usize,
        /// Failed members and their errors.
        failures: Vec<(TaskId, TaskStoreError)>,
    },

    /// The bulk operation was invoked without any task.
    #[error("no tasks selected")]
    EmptySelection,

    /// A workflow payload failed validation.
    #[error("workflow payload is invalid: {0}")]
    WorkflowInvalid(#[from] WorkflowDomainError),

    /// A workflow payload could not be stored; no status call was made.
    #[error("workflow payload could not be stored: {0}")]
    WorkflowPersistence(#[from] WorkflowPersistenceError),

    /// No open workflow session has this identifier.
    #[error("workflow session {0} is not open")]
    UnknownSession(WorkflowSessionId),

    /// A store call outside the optimistic pipeline failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),

    /// The board lock was poisoned by a panicking writer.
    #[error("board state is unavailable")]
    BoardUnavailable,
}

impl SyncError {
    /// Maps a failed mutation write into the taxonomy.
    #[must_use]
    pub fn from_write(task_id: TaskId, operation: &'static str, err: TaskStoreError) -> Self {
        match err {
            TaskStoreError::InvalidStatusFlow { from, .. } => Self::GuardedTransition { task_id, from },
            other => Self::WriteFailed {
                task_id,
                operation,
                source: other,
            },
        }
    }

    /// Returns whether the error is the guarded-transition violation.
    #[must_use]
    pub const fn is_guarded_transition(&self) -> bool {
        matches!(self, Self::GuardedTransition { .. })
    }
}
