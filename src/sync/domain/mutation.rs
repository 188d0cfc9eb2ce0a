//! Optimistic mutations issued by a client.

use crate::task::{
    domain::{DriverId, TaskId, TaskPatch, TaskPriority, TaskStatus},
    ports::StatusExtras,
};
use std::fmt;
use uuid::Uuid;

/// Identifier of one optimistic mutation, used to correlate logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(Uuid);

impl MutationId {
    /// Generates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MutationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MutationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Control a mutation occupies while in flight.
///
/// Two mutations on the same task and lane never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationLane {
    /// Status buttons and status-column drops.
    Status,
    /// Inline field edits and priority changes.
    Fields,
    /// Lead reassignment and driver-column drops.
    Assignment,
    /// Soft deletion.
    Deletion,
}

impl MutationLane {
    /// Returns the lane name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Fields => "fields",
            Self::Assignment => "assignment",
            Self::Deletion => "deletion",
        }
    }
}

impl fmt::Display for MutationLane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Change a mutation makes to one task.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationKind {
    /// Move the task to another status.
    ChangeStatus {
        /// Requested status.
        target: TaskStatus,
        /// Extra fields stored with the status change.
        extras: StatusExtras,
    },
    /// Overwrite task fields.
    EditFields(TaskPatch),
    /// Replace the lead assignee.
    ReassignLead(DriverId),
    /// Set the deletion marker.
    SoftDelete,
}

impl MutationKind {
    /// Status change without extra fields.
    #[must_use]
    pub fn status(target: TaskStatus) -> Self {
        Self::ChangeStatus {
            target,
            extras: StatusExtras::new(),
        }
    }

    /// Priority change expressed as a field edit.
    #[must_use]
    pub fn priority(priority: TaskPriority) -> Self {
        Self::EditFields(TaskPatch::new().with_priority(priority))
    }

    /// Returns the lane the mutation occupies.
    #[must_use]
    pub const fn lane(&self) -> MutationLane {
        match self {
            Self::ChangeStatus { .. } => MutationLane::Status,
            Self::EditFields(_) => MutationLane::Fields,
            Self::ReassignLead(_) => MutationLane::Assignment,
            Self::SoftDelete => MutationLane::Deletion,
        }
    }

    /// Returns the operation name used in logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ChangeStatus { .. } => "update_task_status",
            Self::EditFields(_) => "update_task",
            Self::ReassignLead(_) => "reassign_lead",
            Self::SoftDelete => "soft_delete_task",
        }
    }
}

/// One optimistic mutation of one task.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    id: MutationId,
    task_id: TaskId,
    kind: MutationKind,
}

impl Mutation {
    /// Creates a mutation with a fresh identifier.
    #[must_use]
    pub fn new(task_id: TaskId, kind: MutationKind) -> Self {
        Self {
            id: MutationId::new(),
            task_id,
            kind,
        }
    }

    /// Returns the mutation identifier.
    #[must_use]
    pub const fn id(&self) -> MutationId {
        self.id
    }

    /// Returns the target task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the change.
    #[must_use]
    pub const fn kind(&self) -> &MutationKind {
        &self.kind
    }

    /// Returns the lane the mutation occupies.
    #[must_use]
    pub const fn lane(&self) -> MutationLane {
        self.kind.lane()
    }
}
