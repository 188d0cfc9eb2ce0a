//! Task-to-driver assignment rows.

use super::{AssignmentId, DriverId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Links a task to a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAssignee {
    /// Row identifier.
    pub id: AssignmentId,
    /// Assigned task.
    pub task_id: TaskId,
    /// Assigned driver.
    pub driver_id: DriverId,
    /// Whether this driver is the primary responsible worker.
    pub is_lead: bool,
    /// When the assignment was made.
    pub assigned_at: DateTime<Utc>,
}

impl TaskAssignee {
    /// Creates a lead assignment row.
    #[must_use]
    pub fn lead(task_id: TaskId, driver_id: DriverId, assigned_at: DateTime<Utc>) -> Self {
        Self {
            id: AssignmentId::new(),
            task_id,
            driver_id,
            is_lead: true,
            assigned_at,
        }
    }

    /// Creates a helper (non-lead) assignment row.
    #[must_use]
    pub fn helper(task_id: TaskId, driver_id: DriverId, assigned_at: DateTime<Utc>) -> Self {
        Self {
            id: AssignmentId::new(),
            task_id,
            driver_id,
            is_lead: false,
            assigned_at,
        }
    }
}

/// Assignment rows keyed by row identifier.
///
/// Inserting a lead row removes any other lead row for the same task, so the
/// roster never holds two leads for one task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssigneeRoster {
    rows: BTreeMap<AssignmentId, TaskAssignee>,
}

impl AssigneeRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a roster from rows, applying the one-lead rule in order.
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = TaskAssignee>) -> Self {
        let mut roster = Self::new();
        for row in rows {
            roster.upsert(row);
        }
        roster
    }

    /// Inserts or replaces a row by identifier.
    ///
    /// Returns displaced lead rows for the same task.
    pub fn upsert(&mut self, row: TaskAssignee) -> Vec<TaskAssignee> {
        let displaced = if row.is_lead {
            self.remove_where(|existing| {
                existing.task_id == row.task_id && existing.is_lead && existing.id != row.id
            })
        } else {
            Vec::new()
        };
        self.rows.insert(row.id, row);
        displaced
    }

    /// Removes a row by identifier.
    pub fn remove(&mut self, id: AssignmentId) -> Option<TaskAssignee> {
        self.rows.remove(&id)
    }

    /// Removes every row for a task and returns them.
    pub fn remove_task(&mut self, task_id: TaskId) -> Vec<TaskAssignee> {
        self.remove_where(|row| row.task_id == task_id)
    }

    /// Replaces all rows for a task with `rows`.
    pub fn replace_task(&mut self, task_id: TaskId, rows: Vec<TaskAssignee>) {
        self.remove_task(task_id);
        for row in rows {
            self.upsert(row);
        }
    }

    /// Returns whether a row exists.
    #[must_use]
    pub fn contains(&self, id: AssignmentId) -> bool {
        self.rows.contains_key(&id)
    }

    /// Returns a row by identifier.
    #[must_use]
    pub fn get(&self, id: AssignmentId) -> Option<&TaskAssignee> {
        self.rows.get(&id)
    }

    /// Returns the lead row for a task, if any.
    #[must_use]
    pub fn lead_for(&self, task_id: TaskId) -> Option<&TaskAssignee> {
        self.rows
            .values()
            .find(|row| row.task_id == task_id && row.is_lead)
    }

    /// Returns all rows for a task, lead first.
    #[must_use]
    pub fn rows_for(&self, task_id: TaskId) -> Vec<TaskAssignee> {
        let mut rows: Vec<TaskAssignee> = self
            .rows
            .values()
            .filter(|row| row.task_id == task_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (!row.is_lead, row.assigned_at));
        rows
    }

    /// Returns every row.
    pub fn iter(&self) -> impl Iterator<Item = &TaskAssignee> {
        self.rows.values()
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether the roster has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn remove_where(&mut self, predicate: impl Fn(&TaskAssignee) -> bool) -> Vec<TaskAssignee> {
        let ids: Vec<AssignmentId> = self
            .rows
            .values()
            .filter(|row| predicate(row))
            .map(|row| row.id)
            .collect();
        ids.into_iter()
            .filter_map(|id| self.rows.remove(&id))
            .collect()
    }
}
