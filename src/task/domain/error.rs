//! Error types for task domain validation and parsing.

use super::{DriverId, TaskId};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned while constructing or changing domain task values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskDomainError {
    /// A stop address is empty after trimming.
    #[error("stop address must not be empty")]
    EmptyStopAddress,

    /// The scheduling window ends before it starts.
    #[error("schedule window ends at {end} before it starts at {start}")]
    InvalidSchedule {
        /// Requested window start.
        start: DateTime<Utc>,
        /// Requested window end.
        end: DateTime<Utc>,
    },

    /// The same driver was listed as both lead and co-driver.
    #[error("driver {0} cannot be both lead and co-driver")]
    LeadListedAsCoDriver(DriverId),

    /// A field patch carried no changes.
    #[error("patch for task {0} does not change any field")]
    EmptyPatch(TaskId),
}

/// Error returned while parsing task statuses from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task status: {0}")]
pub struct ParseTaskStatusError(pub String);

/// Error returned while parsing task priorities from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task priority: {0}")]
pub struct ParseTaskPriorityError(pub String);

/// Error returned while parsing task classifications from persistence.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown task kind: {0}")]
pub struct ParseTaskKindError(pub String);
