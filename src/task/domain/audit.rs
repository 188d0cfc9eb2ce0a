//! Append-only audit trail of task writes.

use super::{ActorId, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

/// Kind of write an audit record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Task was created.
    Created,
    /// Task fields were edited.
    Updated,
    /// Task status changed.
    StatusChanged,
    /// A driver was assigned.
    Assigned,
    /// A driver was unassigned.
    Unassigned,
    /// A stop was added to the route.
    StopAdded,
    /// Task was soft-deleted.
    Deleted,
}

impl AuditAction {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::StatusChanged => "status_changed",
            Self::Assigned => "assigned",
            Self::Unassigned => "unassigned",
            Self::StopAdded => "stop_added",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Immutable record of one task write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    id: Uuid,
    task_id: TaskId,
    actor: Option<ActorId>,
    action: AuditAction,
    recorded_at: DateTime<Utc>,
    before: Option<Value>,
    after: Option<Value>,
    diff: Value,
}

/// Parameter object for a new audit record.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    /// Audited task.
    pub task_id: TaskId,
    /// Acting user, when known.
    pub actor: Option<ActorId>,
    /// Kind of write.
    pub action: AuditAction,
    /// Record state before the write.
    pub before: Option<Value>,
    /// Record state after the write.
    pub after: Option<Value>,
}

impl AuditRecord {
    /// Creates a record and computes the field diff between `before` and
    /// `after`.
    #[must_use]
    pub fn new(entry: AuditEntry, recorded_at: DateTime<Utc>) -> Self {
        let diff = field_diff(entry.before.as_ref(), entry.after.as_ref());
        Self {
            id: Uuid::new_v4(),
            task_id: entry.task_id,
            actor: entry.actor,
            action: entry.action,
            recorded_at,
            before: entry.before,
            after: entry.after,
            diff,
        }
    }

    /// Returns the record identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the audited task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the acting user, when known.
    #[must_use]
    pub const fn actor(&self) -> Option<ActorId> {
        self.actor
    }

    /// Returns the kind of write.
    #[must_use]
    pub const fn action(&self) -> AuditAction {
        self.action
    }

    /// Returns when the write was recorded.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// Returns the state before the write.
    #[must_use]
    pub const fn before(&self) -> Option<&Value> {
        self.before.as_ref()
    }

    /// Returns the state after the write.
    #[must_use]
    pub const fn after(&self) -> Option<&Value> {
        self.after.as_ref()
    }

    /// Returns `{field: {"before": .., "after": ..}}` for changed fields.
    #[must_use]
    pub const fn diff(&self) -> &Value {
        &self.diff
    }

    /// Returns the names of fields changed by the write.
    #[must_use]
    pub fn changed_fields(&self) -> Vec<&str> {
        self.diff
            .as_object()
            .map(|fields| fields.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }
}

/// Diffs top-level object fields. Bookkeeping fields are ignored.
fn field_diff(before: Option<&Value>, after: Option<&Value>) -> Value {
    const IGNORED: [&str; 3] = ["revision", "updated_at", "updated_by"];

    let empty = Map::new();
    let before_fields = before.and_then(Value::as_object).unwrap_or(&empty);
    let after_fields = after.and_then(Value::as_object).unwrap_or(&empty);

    let mut diff = Map::new();
    let keys = before_fields.keys().chain(after_fields.keys());
    for key in keys {
        if IGNORED.contains(&key.as_str()) || diff.contains_key(key) {
            continue;
        }
        let old = before_fields.get(key).cloned().unwrap_or(Value::Null);
        let new = after_fields.get(key).cloned().unwrap_or(Value::Null);
        if old != new {
            let mut change = Map::new();
            change.insert("before".to_owned(), old);
            change.insert("after".to_owned(), new);
            diff.insert(key.clone(), Value::Object(change));
        }
    }
    Value::Object(diff)
}
