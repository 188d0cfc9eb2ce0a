//! Partial field updates for dispatcher edits.

use super::{ClientAccountId, Schedule, Stop, Task, TaskKind, TaskPriority, VehicleId};
use serde::{Deserialize, Serialize};

/// Set of task fields to overwrite.
///
/// `None` leaves a field untouched. Reference fields use a nested option so a
/// patch can clear them (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TaskKind>,
    /// New priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    /// New scheduling window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    /// New free-text details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Replacement stop list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stops: Option<Vec<Stop>>,
    /// New customer reference, or `Some(None)` to clear it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<Option<ClientAccountId>>,
    /// New vehicle reference, or `Some(None)` to clear it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vehicle_id: Option<Option<VehicleId>>,
}

impl TaskPatch {
    /// Creates an empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the classification.
    #[must_use]
    pub const fn with_kind(mut self, kind: TaskKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Sets the scheduling window.
    #[must_use]
    pub const fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Sets free-text details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Replaces the stop list.
    #[must_use]
    pub fn with_stops(mut self, stops: Vec<Stop>) -> Self {
        self.stops = Some(stops);
        self
    }

    /// Sets or clears the customer reference.
    #[must_use]
    pub const fn with_client(mut self, client_id: Option<ClientAccountId>) -> Self {
        self.client_id = Some(client_id);
        self
    }

    /// Sets or clears the vehicle reference.
    #[must_use]
    pub const fn with_vehicle(mut self, vehicle_id: Option<VehicleId>) -> Self {
        self.vehicle_id = Some(vehicle_id);
        self
    }

    /// Returns whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.priority.is_none()
            && self.schedule.is_none()
            && self.details.is_none()
            && self.stops.is_none()
            && self.client_id.is_none()
            && self.vehicle_id.is_none()
    }

    /// Returns whether the patch replaces the stop list.
    #[must_use]
    pub const fn touches_stops(&self) -> bool {
        self.stops.is_some()
    }

    /// Returns the patch that puts back `before`'s values for exactly the
    /// fields this patch touches.
    #[must_use]
    pub fn reverting(&self, before: &Task) -> Self {
        Self {
            kind: self.kind.map(|_| before.kind()),
            priority: self.priority.map(|_| before.priority()),
            schedule: self.schedule.map(|_| before.schedule()),
            details: self.details.as_ref().map(|_| before.details().to_owned()),
            stops: self.stops.as_ref().map(|_| before.stops().to_vec()),
            client_id: self.client_id.map(|_| before.client_id()),
            vehicle_id: self.vehicle_id.map(|_| before.vehicle_id()),
        }
    }
}
