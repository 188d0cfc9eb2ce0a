//! Localized user-visible notices.

use super::SyncError;
use crate::task::domain::TaskId;
use minijinja::Environment;
use serde_json::{Map, Value};

/// Kind of user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKey {
    /// Completion was rejected because the task is not in progress.
    StatusRequiresInProgress,
    /// A single write failed and was rolled back.
    WriteFailed,
    /// Every write of a bulk operation succeeded.
    BulkSucceeded,
    /// At least one write of a bulk operation failed.
    BulkFailed,
    /// A workflow payload could not be stored.
    WorkflowPersistenceFailed,
    /// A write on the same control is still in flight.
    ControlBusy,
    /// A remote write overrode a local change.
    Conflict,
}

impl NoticeKey {
    /// Returns the template name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::StatusRequiresInProgress => "status_requires_in_progress",
            Self::WriteFailed => "write_failed",
            Self::BulkSucceeded => "bulk_succeeded",
            Self::BulkFailed => "bulk_failed",
            Self::WorkflowPersistenceFailed => "workflow_persistence_failed",
            Self::ControlBusy => "control_busy",
            Self::Conflict => "conflict",
        }
    }

    /// Returns the severity shown with the notice.
    #[must_use]
    pub const fn level(self) -> NoticeLevel {
        match self {
            Self::BulkSucceeded => NoticeLevel::Success,
            Self::Conflict | Self::ControlBusy => NoticeLevel::Info,
            Self::StatusRequiresInProgress => NoticeLevel::Warning,
            Self::WriteFailed | Self::BulkFailed | Self::WorkflowPersistenceFailed => {
                NoticeLevel::Error
            }
        }
    }
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Neutral information.
    Info,
    /// Confirmation.
    Success,
    /// Recoverable user error.
    Warning,
    /// Failed write.
    Error,
}

/// Rendered notice queued for the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Notice kind.
    pub key: NoticeKey,
    /// Severity.
    pub level: NoticeLevel,
    /// Task the notice refers to, if any.
    pub task_id: Option<TaskId>,
    /// Localized text.
    pub message: String,
}

const EN: &[(&str, &str)] = &[
    (
        "status_requires_in_progress",
        "The task must be in progress before it can be completed.",
    ),
    (
        "write_failed",
        "Could not {% if action == 'update_task_status' %}change the status\
         {% elif action == 'reassign_lead' %}reassign the task\
         {% elif action == 'soft_delete_task' %}delete the task\
         {% else %}save your changes{% endif %}. Your change was undone.",
    ),
    (
        "bulk_succeeded",
        "{{ count }} task{% if count != 1 %}s{% endif %} updated.",
    ),
    (
        "bulk_failed",
        "{{ failed }} of {{ total }} changes failed. \
         {% if restored == total %}All {{ total }} tasks were restored.\
         {% else %}{{ restored }} of {{ total }} tasks were restored; \
         the others already show newer changes.{% endif %}",
    ),
    (
        "workflow_persistence_failed",
        "The form could not be saved. The task status was not changed.",
    ),
    (
        "control_busy",
        "A change to this task is still being saved.",
    ),
    (
        "conflict",
        "{{ actor or 'Another user' }} just changed this task.",
    ),
];

const ES: &[(&str, &str)] = &[
    (
        "status_requires_in_progress",
        "La tarea debe estar en curso antes de poder completarse.",
    ),
    (
        "write_failed",
        "No se pudo {% if action == 'update_task_status' %}cambiar el estado\
         {% elif action == 'reassign_lead' %}reasignar la tarea\
         {% elif action == 'soft_delete_task' %}eliminar la tarea\
         {% else %}guardar los cambios{% endif %}. Se deshizo el cambio.",
    ),
    (
        "bulk_succeeded",
        "{{ count }} tarea{% if count != 1 %}s{% endif %} actualizada{% if count != 1 %}s{% endif %}.",
    ),
    (
        "bulk_failed",
        "Fallaron {{ failed }} de {{ total }} cambios. \
         {% if restored == total %}Se restauraron las {{ total }} tareas.\
         {% else %}Se restauraron {{ restored }} de {{ total }} tareas; \
         las demás ya muestran cambios más recientes.{% endif %}",
    ),
    (
        "workflow_persistence_failed",
        "No se pudo guardar el formulario. El estado de la tarea no cambió.",
    ),
    (
        "control_busy",
        "Todavía se está guardando un cambio en esta tarea.",
    ),
    (
        "conflict",
        "{{ actor or 'Otro usuario' }} acaba de modificar esta tarea.",
    ),
];

/// Renders notices for one locale, falling back to English.
#[derive(Debug, Clone)]
pub struct NoticeCatalog {
    locale: String,
}

impl NoticeCatalog {
    /// Locale used when a template is missing.
    pub const FALLBACK_LOCALE: &'static str = "en";

    /// Creates a catalog for `locale`.
    #[must_use]
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into().trim().to_lowercase(),
        }
    }

    /// Returns the active locale.
    #[must_use]
    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Renders a notice with `context` values available to the template.
    ///
    /// A template that fails to render falls back to its key so a notice is
    /// always produced.
    #[must_use]
    pub fn render(
        &self,
        key: NoticeKey,
        task_id: Option<TaskId>,
        context: &Map<String, Value>,
    ) -> Notice {
        let template = self.template(key);
        let environment = Environment::new();
        let message = environment
            .render_str(template, context)
            .unwrap_or_else(|err| {
                tracing::debug!(notice = key.as_str(), error = %err, "notice template failed");
                key.as_str().to_owned()
            });
        Notice {
            key,
            level: key.level(),
            task_id,
            message,
        }
    }

    /// Renders a notice that needs no context.
    #[must_use]
    pub fn plain(&self, key: NoticeKey, task_id: Option<TaskId>) -> Notice {
        self.render(key, task_id, &Map::new())
    }

    /// Renders the notice shown for a failed gesture, if the error has one.
    #[must_use]
    pub fn for_error(&self, error: &SyncError) -> Option<Notice> {
        match error {
            SyncError::GuardedTransition { task_id, .. } => {
                Some(self.plain(NoticeKey::StatusRequiresInProgress, Some(*task_id)))
            }
            SyncError::WriteFailed {
                task_id, operation, ..
            } => {
                let mut context = Map::new();
                context.insert("action".to_owned(), Value::String((*operation).to_owned()));
                Some(self.render(NoticeKey::WriteFailed, Some(*task_id), &context))
            }
            SyncError::Busy { task_id, .. } => Some(self.plain(NoticeKey::ControlBusy, Some(*task_id))),
            SyncError::PartialBulkFailure {
                failed,
                total,
                restored,
                ..
            } => {
                let mut context = Map::new();
                context.insert("failed".to_owned(), Value::from(*failed));
                context.insert("total".to_owned(), Value::from(*total));
                context.insert("restored".to_owned(), Value::from(*restored));
                Some(self.render(NoticeKey::BulkFailed, None, &context))
            }
            SyncError::WorkflowPersistence(_) => {
                Some(self.plain(NoticeKey::WorkflowPersistenceFailed, None))
            }
            SyncError::UnknownTask(_)
            | SyncError::EmptySelection
            | SyncError::WorkflowInvalid(_)
            | SyncError::UnknownSession(_)
            | SyncError::Store(_)
            | SyncError::BoardUnavailable => None,
        }
    }

    fn template(&self, key: NoticeKey) -> &'static str {
        let table = match self.locale.split(['-', '_']).next() {
            Some("es") => ES,
            _ => EN,
        };
        lookup(table, key)
            .or_else(|| lookup(EN, key))
            .unwrap_or_else(|| key.as_str())
    }
}

impl Default for NoticeCatalog {
    fn default() -> Self {
        Self::new(Self::FALLBACK_LOCALE)
    }
}

fn lookup(table: &[(&str, &'static str)], key: NoticeKey) -> Option<&'static str> {
    table
        .iter()
        .find(|(name, _)| *name == key.as_str())
        .map(|(_, template)| *template)
}
