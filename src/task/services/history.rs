//! Service layer for audit-trail rendering and actor inference.

use crate::task::{
    domain::{ActorId, AuditAction, AuditRecord, TaskId},
    ports::{ActorDirectory, TaskStore, TaskStoreError},
};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// One human-readable line of task history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    /// When the write was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Resolved actor name, when known.
    pub actor_name: Option<String>,
    /// Kind of write.
    pub action: AuditAction,
    /// Changed fields rendered as `field: before → after`.
    pub changes: Vec<String>,
}

/// Service-level errors for history operations.
#[derive(Debug, Error)]
pub enum TaskHistoryError {
    /// Store lookup failed.
    #[error(transparent)]
    Store(#[from] TaskStoreError),
}

/// Result type for history service operations.
pub type TaskHistoryResult<T> = Result<T, TaskHistoryError>;

/// Renders audit trails and infers the actor behind a write.
#[derive(Clone)]
pub struct TaskHistoryService<S, D>
where
    S: TaskStore,
    D: ActorDirectory,
{
    store: Arc<S>,
    directory: Arc<D>,
}

impl<S, D> TaskHistoryService<S, D>
where
    S: TaskStore,
    D: ActorDirectory,
{
    /// Creates a new history service.
    #[must_use]
    pub const fn new(store: Arc<S>, directory: Arc<D>) -> Self {
        Self { store, directory }
    }

    /// Returns the rendered history of a task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaskHistoryError::Store`] when the audit trail cannot be
    /// read.
    pub async fn history(&self, task_id: TaskId) -> TaskHistoryResult<Vec<HistoryEntry>> {
        let records = self.store.audit_trail(task_id).await?;
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let actor_name = match record.actor() {
                Some(actor) => self.directory.display_name(actor).await,
                None => None,
            };
            entries.push(HistoryEntry {
                recorded_at: record.recorded_at(),
                actor_name,
                action: record.action(),
                changes: render_changes(&record),
            });
        }
        Ok(entries)
    }

    /// Returns the actor of the most recent audited write to a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskHistoryError::Store`] when the audit trail cannot be
    /// read.
    pub async fn latest_actor(&self, task_id: TaskId) -> TaskHistoryResult<Option<ActorId>> {
        let records = self.store.audit_trail(task_id).await?;
        Ok(records.iter().rev().find_map(AuditRecord::actor))
    }

    /// Resolves the display name behind a write.
    ///
    /// Uses `actor` when present and falls back to the latest audit record
    /// of the task. Lookup failures resolve to `None`.
    pub async fn resolve_actor_name(
        &self,
        actor: Option<ActorId>,
        task_id: TaskId,
    ) -> Option<String> {
        let resolved = if actor.is_some() {
            actor
        } else {
            match self.latest_actor(task_id).await {
                Ok(found) => found,
                Err(err) => {
                    tracing::debug!(%task_id, error = %err, "actor inference failed");
                    None
                }
            }
        };
        match resolved {
            Some(writer) => self.directory.display_name(writer).await,
            None => None,
        }
    }
}

fn render_changes(record: &AuditRecord) -> Vec<String> {
    let Some(fields) = record.diff().as_object() else {
        return Vec::new();
    };
    fields
        .iter()
        .map(|(field, change)| {
            let before = change.get("before").map_or_else(String::new, render_value);
            let after = change.get("after").map_or_else(String::new, render_value);
            format!("{field}: {before} → {after}")
        })
        .collect()
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => "∅".to_owned(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
