//! Transient indicators that a remote write overrode the local view.

use crate::task::domain::TaskId;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Non-blocking signal attached to a task card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictIndicator {
    /// Overridden task.
    pub task_id: TaskId,
    /// Display name of the remote actor, when resolved.
    pub actor_name: Option<String>,
    /// Commit time of the overriding write.
    pub observed_at: DateTime<Utc>,
    /// When the indicator was raised locally.
    pub raised_at: DateTime<Utc>,
    /// When the indicator clears itself.
    pub expires_at: DateTime<Utc>,
}

impl ConflictIndicator {
    /// Returns whether the indicator is visible at `now`.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Conflict indicators keyed by task, at most one per task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictBoard {
    indicators: BTreeMap<TaskId, ConflictIndicator>,
}

impl ConflictBoard {
    /// Raises or refreshes the indicator for a task.
    pub fn raise(&mut self, indicator: ConflictIndicator) {
        self.indicators.insert(indicator.task_id, indicator);
    }

    /// Removes the indicator for a task, returning whether one existed.
    pub fn dismiss(&mut self, task_id: TaskId) -> bool {
        self.indicators.remove(&task_id).is_some()
    }

    /// Drops indicators that expired at or before `now` and returns how many
    /// were dropped.
    pub fn prune(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.indicators.len();
        self.indicators.retain(|_, indicator| indicator.is_active(now));
        before - self.indicators.len()
    }

    /// Returns the indicator for a task if it is still active at `now`.
    #[must_use]
    pub fn get(&self, task_id: TaskId, now: DateTime<Utc>) -> Option<&ConflictIndicator> {
        self.indicators
            .get(&task_id)
            .filter(|indicator| indicator.is_active(now))
    }

    /// Returns every indicator still active at `now`.
    #[must_use]
    pub fn active(&self, now: DateTime<Utc>) -> Vec<ConflictIndicator> {
        self.indicators
            .values()
            .filter(|indicator| indicator.is_active(now))
            .cloned()
            .collect()
    }

    /// Returns the number of held indicators, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    /// Returns whether no indicators are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }
}
