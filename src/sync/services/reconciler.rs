//! Single reconciliation loop draining the client's inbox.

use crate::sync::domain::{
    ConflictIndicator, NoticeCatalog, NoticeKey, SharedBoard, SyncResult, TaskMerge,
};
use crate::task::{
    domain::{ActorId, Task, TaskAssignee, TaskId},
    ports::{ActorDirectory, ChangeEvent, ChangeOperation, ChangeRecord, TaskStore},
    services::TaskHistoryService,
};
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Message drained by the reconciliation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboxMessage {
    /// A change delivered by the event bus.
    Event(ChangeEvent),
    /// Reload everything from the store after a (re)subscription.
    Resync,
    /// Drop expired conflict indicators.
    Prune,
}

/// Tuning for conflict detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConflictPolicy {
    /// How long after a local change an inbound remote write counts as a
    /// conflict.
    pub window: TimeDelta,
    /// How long an indicator stays visible.
    pub indicator_ttl: TimeDelta,
}

impl ConflictPolicy {
    /// Builds a policy from wall-clock durations.
    #[must_use]
    pub fn from_durations(window: Duration, indicator_ttl: Duration) -> Self {
        Self {
            window: TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX),
            indicator_ttl: TimeDelta::from_std(indicator_ttl).unwrap_or(TimeDelta::MAX),
        }
    }
}

impl Default for ConflictPolicy {
    fn default() -> Self {
        Self {
            window: TimeDelta::seconds(5),
            indicator_ttl: TimeDelta::seconds(10),
        }
    }
}

/// Merges inbound events into the board and flags remote overrides.
///
/// All board updates from the bus flow through one instance, so merges are
/// applied in inbox order.
pub struct Reconciler<S, D, C>
where
    S: TaskStore,
    D: ActorDirectory,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    history: TaskHistoryService<S, D>,
    board: SharedBoard,
    notices: Arc<NoticeCatalog>,
    clock: Arc<C>,
    actor: ActorId,
    policy: ConflictPolicy,
}

impl<S, D, C> Reconciler<S, D, C>
where
    S: TaskStore,
    D: ActorDirectory,
    C: Clock + Send + Sync,
{
    /// Creates a reconciler for the client acting as `actor`.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        directory: Arc<D>,
        board: SharedBoard,
        notices: Arc<NoticeCatalog>,
        clock: Arc<C>,
        actor: ActorId,
        policy: ConflictPolicy,
    ) -> Self {
        Self {
            history: TaskHistoryService::new(Arc::clone(&store), directory),
            store,
            board,
            notices,
            clock,
            actor,
            policy,
        }
    }

    /// Handles one inbox message.
    ///
    /// # Errors
    ///
    /// Returns a store error when a resync cannot read the store and
    /// [`SyncError::BoardUnavailable`] when the board lock is poisoned.
    ///
    /// [`SyncError::BoardUnavailable`]: crate::sync::domain::SyncError::BoardUnavailable
    pub async fn handle(&self, message: InboxMessage) -> SyncResult<()> {
        match message {
            InboxMessage::Event(event) => self.apply_event(event).await,
            InboxMessage::Resync => self.resync().await.map(|_| ()),
            InboxMessage::Prune => self.prune().map(|_| ()),
        }
    }

    /// Merges one change event into the board.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] when the board lock is
    /// poisoned.
    ///
    /// [`SyncError::BoardUnavailable`]: crate::sync::domain::SyncError::BoardUnavailable
    pub async fn apply_event(&self, event: ChangeEvent) -> SyncResult<()> {
        let committed_at = event.committed_at;
        match (event.operation, event.record) {
            (ChangeOperation::Delete, ChangeRecord::Tasks(task)) => {
                let task_id = task.id();
                let revision = task.revision();
                if self.board.write(|board| board.discard_task(task_id, revision))? {
                    tracing::debug!(%task_id, "task removed by remote delete");
                }
                Ok(())
            }
            (_, ChangeRecord::Tasks(task)) => self.merge_task(task, committed_at).await,
            (ChangeOperation::Delete, ChangeRecord::TaskAssignees(row)) => {
                self.board.write(|board| board.remove_assignee(row.id))?;
                Ok(())
            }
            (_, ChangeRecord::TaskAssignees(row)) => self.merge_assignee(row, committed_at).await,
        }
    }

    /// Reloads every task and assignment row from the store.
    ///
    /// Returns the number of tasks that changed on the board.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] when the store cannot be read.
    ///
    /// [`SyncError::Store`]: crate::sync::domain::SyncError::Store
    pub async fn resync(&self) -> SyncResult<usize> {
        let tasks = self.store.list_tasks().await?;
        let rows = self.store.list_assignees().await?;
        let changed = self.board.write(|board| board.reload(tasks, rows))?;
        tracing::debug!(changed, "board resynchronized from store");
        Ok(changed)
    }

    /// Drops expired conflict indicators and stale local-change marks.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] when the board lock is
    /// poisoned.
    ///
    /// [`SyncError::BoardUnavailable`]: crate::sync::domain::SyncError::BoardUnavailable
    pub fn prune(&self) -> SyncResult<usize> {
        let now = self.clock.utc();
        let window = self.policy.window;
        self.board.write(|board| board.prune(now, window))
    }

    /// Drains `inbox` until every sender is gone, pruning on a fixed tick.
    pub async fn run(self, mut inbox: mpsc::Receiver<InboxMessage>, prune_every: Duration) {
        let mut ticker = tokio::time::interval(prune_every.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                message = inbox.recv() => {
                    let Some(received) = message else {
                        break;
                    };
                    if let Err(err) = self.handle(received).await {
                        tracing::warn!(error = %err, "inbox message not applied");
                    }
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.prune() {
                        tracing::warn!(error = %err, "conflict pruning failed");
                    }
                }
            }
        }
        tracing::debug!("reconciler inbox closed");
    }

    async fn merge_task(&self, task: Task, committed_at: DateTime<Utc>) -> SyncResult<()> {
        let task_id = task.id();
        let updated_by = task.updated_by();
        let merge = self.board.write(|board| board.merge_task(task))?;
        let TaskMerge::Updated {
            local_change_at: Some(local_change_at),
        } = merge
        else {
            return Ok(());
        };
        // Writes by this actor from any device count as our own.
        if !self.within_window(local_change_at) || updated_by == Some(self.actor) {
            return Ok(());
        }
        let actor = match updated_by {
            Some(writer) => Some(writer),
            None => self.infer_actor(task_id).await,
        };
        if actor == Some(self.actor) {
            return Ok(());
        }
        self.raise_conflict(task_id, actor, committed_at).await
    }

    async fn merge_assignee(&self, row: TaskAssignee, committed_at: DateTime<Utc>) -> SyncResult<()> {
        let task_id = row.task_id;
        let driver_id = row.driver_id;
        let is_lead = row.is_lead;
        let (held_lead, local_change_at, changed) = self.board.write(|board| {
            let held_lead = board.lead_for(task_id);
            let local_change_at = board.local_change_at(task_id);
            (held_lead, local_change_at, board.merge_assignee(row))
        })?;
        if !changed || !is_lead || held_lead == Some(driver_id) {
            return Ok(());
        }
        if !local_change_at.is_some_and(|at| self.within_window(at)) {
            return Ok(());
        }
        // Assignment rows carry no writer, so the audit trail names it.
        let actor = self.infer_actor(task_id).await;
        if actor == Some(self.actor) {
            return Ok(());
        }
        self.raise_conflict(task_id, actor, committed_at).await
    }

    fn within_window(&self, local_change_at: DateTime<Utc>) -> bool {
        self.clock.utc() - local_change_at <= self.policy.window
    }

    async fn infer_actor(&self, task_id: TaskId) -> Option<ActorId> {
        match self.history.latest_actor(task_id).await {
            Ok(actor) => actor,
            Err(err) => {
                tracing::debug!(%task_id, error = %err, "actor inference failed");
                None
            }
        }
    }

    async fn raise_conflict(
        &self,
        task_id: TaskId,
        actor: Option<ActorId>,
        observed_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        let actor_name = match actor {
            Some(known) => self.history.resolve_actor_name(Some(known), task_id).await,
            None => None,
        };
        let mut context = Map::new();
        if let Some(name) = &actor_name {
            context.insert("actor".to_owned(), Value::String(name.clone()));
        }
        let notice = self.notices.render(NoticeKey::Conflict, Some(task_id), &context);
        let now = self.clock.utc();
        let indicator = ConflictIndicator {
            task_id,
            actor_name,
            observed_at,
            raised_at: now,
            expires_at: now
                .checked_add_signed(self.policy.indicator_ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };
        let raised = self.board.write(|board| {
            if board.task(task_id).is_none() {
                return false;
            }
            board.raise_conflict(indicator);
            board.push_notice(notice);
            true
        })?;
        if raised {
            tracing::info!(%task_id, actor = ?actor, "remote write overrode a local change");
        }
        Ok(())
    }
}
