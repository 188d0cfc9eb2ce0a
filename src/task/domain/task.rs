//! Task record and related lifecycle types.

use super::{
    ActorId, ClientAccountId, ParseTaskKindError, ParseTaskPriorityError, ParseTaskStatusError,
    Stop, TaskDomainError, TaskId, TaskPatch, VehicleId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status.
///
/// The nominal flow is `pending → in_progress → completed`, with `blocked`
/// reachable from `pending` or `in_progress` and returning to `in_progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task is scheduled but work has not started.
    Pending,
    /// A field worker is performing the task.
    InProgress,
    /// Work cannot proceed until an external issue is resolved.
    Blocked,
    /// Task has been completed.
    Completed,
}

impl TaskStatus {
    /// All statuses in board column order.
    pub const ALL: [Self; 4] = [
        Self::Pending,
        Self::InProgress,
        Self::Blocked,
        Self::Completed,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Blocked => "blocked",
            Self::Completed => "completed",
        }
    }

    /// Returns whether the task store accepts a move from this stored status
    /// to `target`.
    ///
    /// The store enforces a single ordering rule: a task may only become
    /// `completed` from `in_progress`. Every other move is accepted.
    #[must_use]
    pub const fn store_accepts(self, target: Self) -> bool {
        !matches!(target, Self::Completed) || matches!(self, Self::InProgress)
    }

    /// Returns whether `target` is an edge of the nominal lifecycle graph.
    ///
    /// Field-worker clients use this to decide which status buttons to offer.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::InProgress | Self::Blocked)
                | (Self::InProgress, Self::Blocked | Self::Completed)
                | (Self::Blocked, Self::InProgress)
        )
    }

    /// Returns the nominal successor statuses.
    #[must_use]
    pub fn next_states(self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|target| self.can_transition_to(*target))
            .collect()
    }

    /// Returns whether the status has no nominal successor.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "blocked" => Ok(Self::Blocked),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Low priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
}

impl TaskPriority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskPriority {
    type Error = ParseTaskPriorityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ParseTaskPriorityError(value.to_owned())),
        }
    }
}

/// Classification of field work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Collect a vehicle from a customer.
    Pickup,
    /// Deliver a vehicle to a customer.
    Delivery,
    /// Road test or inspection drive.
    Test,
    /// Roadside rescue of a broken-down vehicle.
    Rescue,
    /// Move a vehicle between internal sites.
    Transfer,
    /// Anything else.
    Other,
}

impl TaskKind {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pickup => "pickup",
            Self::Delivery => "delivery",
            Self::Test => "test",
            Self::Rescue => "rescue",
            Self::Transfer => "transfer",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for TaskKind {
    type Error = ParseTaskKindError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pickup" => Ok(Self::Pickup),
            "delivery" => Ok(Self::Delivery),
            "test" => Ok(Self::Test),
            "rescue" => Ok(Self::Rescue),
            "transfer" => Ok(Self::Transfer),
            "other" => Ok(Self::Other),
            _ => Err(ParseTaskKindError(value.to_owned())),
        }
    }
}

/// Estimated scheduling window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    estimated_start: Option<DateTime<Utc>>,
    estimated_end: Option<DateTime<Utc>>,
}

impl Schedule {
    /// Creates a validated scheduling window.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidSchedule`] when both bounds are set
    /// and the end precedes the start.
    pub fn new(
        estimated_start: Option<DateTime<Utc>>,
        estimated_end: Option<DateTime<Utc>>,
    ) -> Result<Self, TaskDomainError> {
        if let (Some(start), Some(end)) = (estimated_start, estimated_end) {
            if end < start {
                return Err(TaskDomainError::InvalidSchedule { start, end });
            }
        }
        Ok(Self {
            estimated_start,
            estimated_end,
        })
    }

    /// Returns the estimated start.
    #[must_use]
    pub const fn estimated_start(&self) -> Option<DateTime<Utc>> {
        self.estimated_start
    }

    /// Returns the estimated end.
    #[must_use]
    pub const fn estimated_end(&self) -> Option<DateTime<Utc>> {
        self.estimated_end
    }
}

/// Field set supplied when creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Task classification.
    pub kind: TaskKind,
    /// Initial priority.
    pub priority: TaskPriority,
    /// Free-text details.
    pub details: String,
    /// Scheduling window.
    pub schedule: Schedule,
    /// Ordered stops.
    pub stops: Vec<Stop>,
    /// Customer account reference.
    pub client_id: Option<ClientAccountId>,
    /// Vehicle reference.
    pub vehicle_id: Option<VehicleId>,
}

impl NewTask {
    /// Creates a task draft with the given classification and defaults.
    #[must_use]
    pub const fn new(kind: TaskKind) -> Self {
        Self {
            kind,
            priority: TaskPriority::Medium,
            details: String::new(),
            schedule: Schedule {
                estimated_start: None,
                estimated_end: None,
            },
            stops: Vec::new(),
            client_id: None,
            vehicle_id: None,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Sets free-text details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Sets the scheduling window.
    #[must_use]
    pub const fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Appends a stop.
    #[must_use]
    pub fn with_stop(mut self, stop: Stop) -> Self {
        self.stops.push(stop);
        self
    }

    /// Sets the customer account.
    #[must_use]
    pub const fn with_client(mut self, client_id: ClientAccountId) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Sets the vehicle.
    #[must_use]
    pub const fn with_vehicle(mut self, vehicle_id: VehicleId) -> Self {
        self.vehicle_id = Some(vehicle_id);
        self
    }
}

/// A unit of field work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    kind: TaskKind,
    priority: TaskPriority,
    status: TaskStatus,
    schedule: Schedule,
    details: String,
    stops: Vec<Stop>,
    client_id: Option<ClientAccountId>,
    vehicle_id: Option<VehicleId>,
    deleted_at: Option<DateTime<Utc>>,
    revision: u64,
    updated_by: Option<ActorId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Persisted classification.
    pub kind: TaskKind,
    /// Persisted priority.
    pub priority: TaskPriority,
    /// Persisted status.
    pub status: TaskStatus,
    /// Persisted scheduling window.
    pub schedule: Schedule,
    /// Persisted details.
    pub details: String,
    /// Persisted stops in route order.
    pub stops: Vec<Stop>,
    /// Persisted customer reference.
    pub client_id: Option<ClientAccountId>,
    /// Persisted vehicle reference.
    pub vehicle_id: Option<VehicleId>,
    /// Persisted soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Persisted write revision.
    pub revision: u64,
    /// Actor of the latest write, when recorded.
    pub updated_by: Option<ActorId>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted latest write timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new pending task at revision 1.
    #[must_use]
    pub fn create(id: TaskId, draft: NewTask, actor: ActorId, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id,
            kind: draft.kind,
            priority: draft.priority,
            status: TaskStatus::Pending,
            schedule: draft.schedule,
            details: draft.details,
            stops: draft.stops,
            client_id: draft.client_id,
            vehicle_id: draft.vehicle_id,
            deleted_at: None,
            revision: 1,
            updated_by: Some(actor),
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            kind: data.kind,
            priority: data.priority,
            status: data.status,
            schedule: data.schedule,
            details: data.details,
            stops: data.stops,
            client_id: data.client_id,
            vehicle_id: data.vehicle_id,
            deleted_at: data.deleted_at,
            revision: data.revision,
            updated_by: data.updated_by,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the classification.
    #[must_use]
    pub const fn kind(&self) -> TaskKind {
        self.kind
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the scheduling window.
    #[must_use]
    pub const fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Returns free-text details.
    #[must_use]
    pub fn details(&self) -> &str {
        &self.details
    }

    /// Returns the stops in route order.
    #[must_use]
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// Returns the customer account reference.
    #[must_use]
    pub const fn client_id(&self) -> Option<ClientAccountId> {
        self.client_id
    }

    /// Returns the vehicle reference.
    #[must_use]
    pub const fn vehicle_id(&self) -> Option<VehicleId> {
        self.vehicle_id
    }

    /// Returns the soft-delete marker.
    #[must_use]
    pub const fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }

    /// Returns whether the task has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns the store-assigned write revision.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the actor of the latest committed write, when recorded.
    #[must_use]
    pub const fn updated_by(&self) -> Option<ActorId> {
        self.updated_by
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest write timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Overwrites every field present in `patch`.
    pub fn apply_patch(&mut self, patch: &TaskPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(schedule) = patch.schedule {
            self.schedule = schedule;
        }
        if let Some(details) = &patch.details {
            self.details.clone_from(details);
        }
        if let Some(stops) = &patch.stops {
            self.stops.clone_from(stops);
        }
        if let Some(client_id) = patch.client_id {
            self.client_id = client_id;
        }
        if let Some(vehicle_id) = patch.vehicle_id {
            self.vehicle_id = vehicle_id;
        }
    }

    /// Sets the status without any ordering check.
    #[expect(
        clippy::missing_const_for_fn,
        reason = "&mut self methods cannot be const in stable Rust"
    )]
    pub fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    /// Sets the soft-delete marker.
    #[expect(
        clippy::missing_const_for_fn,
        reason = "&mut self methods cannot be const in stable Rust"
    )]
    pub fn mark_deleted(&mut self, deleted_at: DateTime<Utc>) {
        self.deleted_at = Some(deleted_at);
    }

    /// Records a committed write: bumps the revision and stamps the actor and
    /// write time.
    pub fn stamp(&mut self, actor: ActorId, at: DateTime<Utc>) {
        self.revision += 1;
        self.updated_by = Some(actor);
        self.updated_at = at;
    }
}
