//! In-memory task store for tests and local simulation.

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use super::InMemoryChangeEventBus;
use crate::task::{
    domain::{
        ActorId, AssigneeRoster, AuditAction, AuditEntry, AuditRecord, DriverId, NewTask, Task,
        TaskAssignee, TaskDomainError, TaskId, TaskPatch, TaskStatus,
    },
    ports::{
        ChangeEvent, ChangeOperation, ChangeRecord, StatusExtras, TaskStore, TaskStoreError,
        TaskStoreResult,
    },
};

/// A write request as received by the in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    /// `create_task` was called.
    CreateTask {
        /// Requested lead driver.
        lead: Option<DriverId>,
    },
    /// `update_task` was called.
    UpdateTask {
        /// Target task.
        task_id: TaskId,
    },
    /// `update_task_status` was called.
    UpdateTaskStatus {
        /// Target task.
        task_id: TaskId,
        /// Requested status.
        next: TaskStatus,
    },
    /// `reassign_lead` was called.
    ReassignLead {
        /// Target task.
        task_id: TaskId,
        /// Requested lead driver.
        driver_id: DriverId,
    },
    /// `soft_delete_task` was called.
    SoftDeleteTask {
        /// Target task.
        task_id: TaskId,
    },
}

/// Thread-safe in-memory task store publishing to an in-memory bus.
///
/// Enforces the same write rules as the production store: only an
/// `in_progress` task may become `completed`, at most one lead row exists per
/// task, and deletion only sets a marker.
#[derive(Clone)]
pub struct InMemoryTaskStore<C = DefaultClock>
where
    C: Clock + Send + Sync,
{
    state: Arc<RwLock<InMemoryStoreState>>,
    bus: InMemoryChangeEventBus,
    clock: Arc<C>,
}

#[derive(Debug, Default)]
struct InMemoryStoreState {
    tasks: HashMap<TaskId, Task>,
    roster: AssigneeRoster,
    audit: Vec<AuditRecord>,
    status_extras: HashMap<TaskId, StatusExtras>,
    calls: Vec<StoreCall>,
    failures_remaining: usize,
    failing_tasks: HashSet<TaskId>,
}

impl InMemoryStoreState {
    fn take_injected_failure(&mut self, task_id: Option<TaskId>) -> Option<TaskStoreError> {
        let targeted = task_id.is_some_and(|id| self.failing_tasks.contains(&id));
        if targeted || self.failures_remaining > 0 {
            if !targeted {
                self.failures_remaining -= 1;
            }
            return Some(TaskStoreError::persistence(std::io::Error::other(
                "injected store failure",
            )));
        }
        None
    }

    fn live_task_mut(&mut self, id: TaskId) -> TaskStoreResult<&mut Task> {
        let task = self
            .tasks
            .get_mut(&id)
            .ok_or(TaskStoreError::NotFound(id))?;
        if task.is_deleted() {
            return Err(TaskStoreError::Deleted(id));
        }
        Ok(task)
    }
}

impl InMemoryTaskStore<DefaultClock> {
    /// Creates an empty store publishing to `bus`.
    #[must_use]
    pub fn new(bus: InMemoryChangeEventBus) -> Self {
        Self::with_clock(bus, Arc::new(DefaultClock))
    }
}

impl<C> InMemoryTaskStore<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty store with an explicit clock.
    #[must_use]
    pub fn with_clock(bus: InMemoryChangeEventBus, clock: Arc<C>) -> Self {
        Self {
            state: Arc::new(RwLock::new(InMemoryStoreState::default())),
            bus,
            clock,
        }
    }

    /// Returns the bus this store publishes to.
    #[must_use]
    pub const fn bus(&self) -> &InMemoryChangeEventBus {
        &self.bus
    }

    /// Makes the next `count` writes fail with a persistence error.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when lock acquisition fails.
    pub fn fail_next_writes(&self, count: usize) -> TaskStoreResult<()> {
        self.write_state()?.failures_remaining = count;
        Ok(())
    }

    /// Makes every write to `task_id` fail until cleared.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when lock acquisition fails.
    pub fn fail_writes_to(&self, task_id: TaskId) -> TaskStoreResult<()> {
        self.write_state()?.failing_tasks.insert(task_id);
        Ok(())
    }

    /// Clears every injected failure.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when lock acquisition fails.
    pub fn clear_failures(&self) -> TaskStoreResult<()> {
        let mut state = self.write_state()?;
        state.failures_remaining = 0;
        state.failing_tasks.clear();
        Ok(())
    }

    /// Returns every write request received so far, in arrival order.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when lock acquisition fails.
    pub fn calls(&self) -> TaskStoreResult<Vec<StoreCall>> {
        Ok(self.read_state()?.calls.clone())
    }

    /// Returns the extra fields stored with the latest status change.
    ///
    /// # Errors
    ///
    /// Returns a persistence error when lock acquisition fails.
    pub fn status_extras(&self, task_id: TaskId) -> TaskStoreResult<Option<StatusExtras>> {
        Ok(self.read_state()?.status_extras.get(&task_id).cloned())
    }

    fn write_state(&self) -> TaskStoreResult<std::sync::RwLockWriteGuard<'_, InMemoryStoreState>> {
        self.state
            .write()
            .map_err(|err| TaskStoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn read_state(&self) -> TaskStoreResult<std::sync::RwLockReadGuard<'_, InMemoryStoreState>> {
        self.state
            .read()
            .map_err(|err| TaskStoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn publish(&self, operation: ChangeOperation, record: ChangeRecord) {
        let event = ChangeEvent::new(operation, record, self.clock.utc());
        let delivered = self.bus.publish(&event);
        tracing::debug!(
            collection = %event.record.collection(),
            task_id = %event.record.task_id(),
            ?operation,
            delivered,
            "published change event"
        );
    }

    fn audit(&self, state: &mut InMemoryStoreState, entry: AuditEntry) {
        state.audit.push(AuditRecord::new(entry, self.clock.utc()));
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> TaskStoreResult<Value> {
    serde_json::to_value(value).map_err(TaskStoreError::persistence)
}

fn dedupe_co_drivers(
    lead: Option<DriverId>,
    co_drivers: &[DriverId],
) -> TaskStoreResult<Vec<DriverId>> {
    let mut seen = HashSet::new();
    let mut helpers = Vec::new();
    for driver in co_drivers {
        if Some(*driver) == lead {
            return Err(TaskDomainError::LeadListedAsCoDriver(*driver).into());
        }
        if seen.insert(*driver) {
            helpers.push(*driver);
        }
    }
    Ok(helpers)
}

fn audit_action_for(patch: &TaskPatch, before: &Task) -> AuditAction {
    let only_stops = patch.touches_stops()
        && TaskPatch {
            stops: None,
            ..patch.clone()
        }
        .is_empty();
    let grew = patch
        .stops
        .as_ref()
        .is_some_and(|stops| stops.len() > before.stops().len());
    if only_stops && grew {
        AuditAction::StopAdded
    } else {
        AuditAction::Updated
    }
}

#[async_trait]
impl<C> TaskStore for InMemoryTaskStore<C>
where
    C: Clock + Send + Sync,
{
    async fn list_tasks(&self) -> TaskStoreResult<Vec<Task>> {
        let state = self.read_state()?;
        let mut tasks: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| !task.is_deleted())
            .cloned()
            .collect();
        tasks.sort_by_key(|task| (task.created_at(), task.id()));
        Ok(tasks)
    }

    async fn list_assignees(&self) -> TaskStoreResult<Vec<TaskAssignee>> {
        Ok(self.read_state()?.roster.iter().cloned().collect())
    }

    async fn find_task(&self, id: TaskId) -> TaskStoreResult<Option<Task>> {
        Ok(self.read_state()?.tasks.get(&id).cloned())
    }

    async fn audit_trail(&self, id: TaskId) -> TaskStoreResult<Vec<AuditRecord>> {
        let state = self.read_state()?;
        Ok(state
            .audit
            .iter()
            .filter(|record| record.task_id() == id)
            .cloned()
            .collect())
    }

    async fn create_task(
        &self,
        draft: NewTask,
        lead: Option<DriverId>,
        co_drivers: &[DriverId],
        actor: ActorId,
    ) -> TaskStoreResult<Task> {
        let mut state = self.write_state()?;
        state.calls.push(StoreCall::CreateTask { lead });
        if let Some(err) = state.take_injected_failure(None) {
            return Err(err);
        }
        let helpers = dedupe_co_drivers(lead, co_drivers)?;

        let task = Task::create(TaskId::new(), draft, actor, &*self.clock);
        let now = self.clock.utc();
        let mut rows = Vec::new();
        if let Some(driver) = lead {
            rows.push(TaskAssignee::lead(task.id(), driver, now));
        }
        rows.extend(
            helpers
                .into_iter()
                .map(|driver| TaskAssignee::helper(task.id(), driver, now)),
        );

        state.tasks.insert(task.id(), task.clone());
        let after = to_json(&task)?;
        self.audit(
            &mut state,
            AuditEntry {
                task_id: task.id(),
                actor: Some(actor),
                action: AuditAction::Created,
                before: None,
                after: Some(after),
            },
        );
        self.publish(ChangeOperation::Insert, ChangeRecord::Tasks(task.clone()));

        for row in rows {
            state.roster.upsert(row.clone());
            let after = to_json(&row)?;
            self.audit(
                &mut state,
                AuditEntry {
                    task_id: task.id(),
                    actor: Some(actor),
                    action: AuditAction::Assigned,
                    before: None,
                    after: Some(after),
                },
            );
            self.publish(ChangeOperation::Insert, ChangeRecord::TaskAssignees(row));
        }
        Ok(task)
    }

    async fn update_task(
        &self,
        id: TaskId,
        patch: &TaskPatch,
        actor: ActorId,
    ) -> TaskStoreResult<Task> {
        let mut state = self.write_state()?;
        state.calls.push(StoreCall::UpdateTask { task_id: id });
        if let Some(err) = state.take_injected_failure(Some(id)) {
            return Err(err);
        }
        if patch.is_empty() {
            return Err(TaskDomainError::EmptyPatch(id).into());
        }

        let task = state.live_task_mut(id)?;
        let before_task = task.clone();
        task.apply_patch(patch);
        task.stamp(actor, self.clock.utc());
        let updated = task.clone();

        let action = audit_action_for(patch, &before_task);
        let before = to_json(&before_task)?;
        let after = to_json(&updated)?;
        self.audit(
            &mut state,
            AuditEntry {
                task_id: id,
                actor: Some(actor),
                action,
                before: Some(before),
                after: Some(after),
            },
        );
        self.publish(ChangeOperation::Update, ChangeRecord::Tasks(updated.clone()));
        Ok(updated)
    }

    async fn update_task_status(
        &self,
        id: TaskId,
        next: TaskStatus,
        actor: ActorId,
        extras: &StatusExtras,
    ) -> TaskStoreResult<()> {
        let mut state = self.write_state()?;
        state.calls.push(StoreCall::UpdateTaskStatus { task_id: id, next });
        if let Some(err) = state.take_injected_failure(Some(id)) {
            return Err(err);
        }

        let task = state.live_task_mut(id)?;
        let from = task.status();
        if !from.store_accepts(next) {
            return Err(TaskStoreError::InvalidStatusFlow {
                task_id: id,
                from,
                to: next,
            });
        }
        let before_task = task.clone();
        task.set_status(next);
        task.stamp(actor, self.clock.utc());
        let updated = task.clone();

        if !extras.is_empty() {
            state.status_extras.insert(id, extras.clone());
        }
        let before = to_json(&before_task)?;
        let mut after = to_json(&updated)?;
        if let (Some(fields), false) = (after.as_object_mut(), extras.is_empty()) {
            fields.insert("extras".to_owned(), Value::Object(extras.clone()));
        }
        self.audit(
            &mut state,
            AuditEntry {
                task_id: id,
                actor: Some(actor),
                action: AuditAction::StatusChanged,
                before: Some(before),
                after: Some(after),
            },
        );
        self.publish(ChangeOperation::Update, ChangeRecord::Tasks(updated));
        Ok(())
    }

    async fn reassign_lead(
        &self,
        task_id: TaskId,
        driver_id: DriverId,
        actor: ActorId,
    ) -> TaskStoreResult<()> {
        let mut state = self.write_state()?;
        state.calls.push(StoreCall::ReassignLead { task_id, driver_id });
        if let Some(err) = state.take_injected_failure(Some(task_id)) {
            return Err(err);
        }
        state.live_task_mut(task_id)?;

        if state
            .roster
            .lead_for(task_id)
            .is_some_and(|lead| lead.driver_id == driver_id)
        {
            return Ok(());
        }

        let displaced: Vec<TaskAssignee> = state
            .roster
            .rows_for(task_id)
            .into_iter()
            .filter(|row| row.is_lead || row.driver_id == driver_id)
            .collect();
        for row in displaced {
            state.roster.remove(row.id);
            let before = to_json(&row)?;
            self.audit(
                &mut state,
                AuditEntry {
                    task_id,
                    actor: Some(actor),
                    action: AuditAction::Unassigned,
                    before: Some(before),
                    after: None,
                },
            );
            self.publish(ChangeOperation::Delete, ChangeRecord::TaskAssignees(row));
        }

        let lead = TaskAssignee::lead(task_id, driver_id, self.clock.utc());
        state.roster.upsert(lead.clone());
        let after = to_json(&lead)?;
        self.audit(
            &mut state,
            AuditEntry {
                task_id,
                actor: Some(actor),
                action: AuditAction::Assigned,
                before: None,
                after: Some(after),
            },
        );
        self.publish(ChangeOperation::Insert, ChangeRecord::TaskAssignees(lead));
        Ok(())
    }

    async fn soft_delete_task(&self, id: TaskId, actor: ActorId) -> TaskStoreResult<()> {
        let mut state = self.write_state()?;
        state.calls.push(StoreCall::SoftDeleteTask { task_id: id });
        if let Some(err) = state.take_injected_failure(Some(id)) {
            return Err(err);
        }
        let task = state
            .tasks
            .get_mut(&id)
            .ok_or(TaskStoreError::NotFound(id))?;
        if task.is_deleted() {
            return Ok(());
        }
        let before_task = task.clone();
        let now = self.clock.utc();
        task.mark_deleted(now);
        task.stamp(actor, now);
        let updated = task.clone();

        let before = to_json(&before_task)?;
        let after = to_json(&updated)?;
        self.audit(
            &mut state,
            AuditEntry {
                task_id: id,
                actor: Some(actor),
                action: AuditAction::Deleted,
                before: Some(before),
                after: Some(after),
            },
        );
        self.publish(ChangeOperation::Update, ChangeRecord::Tasks(updated));

        for row in state.roster.remove_task(id) {
            self.publish(ChangeOperation::Delete, ChangeRecord::TaskAssignees(row));
        }
        Ok(())
    }
}
