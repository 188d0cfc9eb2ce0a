//! Notification intents for drivers affected by a committed write.

use crate::task::{
    domain::{DriverId, Task, TaskId, TaskPatch},
    ports::{NotificationEventType, NotificationIntent, NotificationSink},
};
use serde_json::json;
use std::sync::Arc;

/// Emits notification intents after writes that affect assignees.
///
/// Emission happens strictly after the store accepted the write. A failed
/// hand-off is logged and otherwise ignored.
pub struct AssignmentNotifier<N>
where
    N: NotificationSink,
{
    sink: Arc<N>,
}

impl<N> AssignmentNotifier<N>
where
    N: NotificationSink,
{
    /// Creates a notifier handing intents to `sink`.
    #[must_use]
    pub const fn new(sink: Arc<N>) -> Self {
        Self { sink }
    }

    /// Tells the lead and co-drivers of a new task about it.
    pub async fn task_created(&self, task: &Task, lead: Option<DriverId>, co_drivers: &[DriverId]) {
        let recipients: Vec<DriverId> = lead.into_iter().chain(co_drivers.iter().copied()).collect();
        let payload = json!({
            "kind": task.kind().as_str(),
            "priority": task.priority().as_str(),
            "lead": lead,
        });
        self.emit(NotificationEventType::TaskAssigned, task.id(), recipients, payload)
            .await;
    }

    /// Tells the new lead, and the displaced one if any, about a
    /// reassignment.
    pub async fn lead_reassigned(
        &self,
        task_id: TaskId,
        lead: DriverId,
        previous: Option<DriverId>,
    ) {
        let recipients: Vec<DriverId> = std::iter::once(lead)
            .chain(previous.filter(|driver| *driver != lead))
            .collect();
        let payload = json!({
            "lead": lead,
            "previous_lead": previous,
        });
        self.emit(NotificationEventType::TaskReassigned, task_id, recipients, payload)
            .await;
    }

    /// Tells the current assignees that task fields changed.
    pub async fn task_updated(&self, task_id: TaskId, assignees: Vec<DriverId>, patch: &TaskPatch) {
        let fields: Vec<String> = serde_json::to_value(patch)
            .ok()
            .and_then(|value| value.as_object().map(|map| map.keys().cloned().collect()))
            .unwrap_or_default();
        let payload = json!({ "fields": fields });
        self.emit(NotificationEventType::TaskUpdated, task_id, assignees, payload)
            .await;
    }

    async fn emit(
        &self,
        event_type: NotificationEventType,
        task_id: TaskId,
        recipients: Vec<DriverId>,
        payload: serde_json::Value,
    ) {
        if recipients.is_empty() {
            return;
        }
        let intent = NotificationIntent {
            event_type,
            task_id,
            recipients,
            payload,
        };
        if let Err(err) = self.sink.emit(intent).await {
            tracing::warn!(%task_id, ?event_type, error = %err, "notification hand-off failed");
        }
    }
}
