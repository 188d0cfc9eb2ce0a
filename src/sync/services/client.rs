//! One dispatcher's connection to the shared task store.

use super::bulk::{BulkAction, BulkCoordinator, BulkReport};
use super::notify::AssignmentNotifier;
use super::pipeline::{MutationOutcome, MutationPipeline};
use super::reconciler::{ConflictPolicy, InboxMessage, Reconciler};
use super::subscription::SubscriptionSupervisor;
use super::transition::{TransitionCoordinator, TransitionOutcome};
use crate::config::SyncConfig;
use crate::sync::domain::{
    BoardState, DropTarget, Freshness, Mutation, MutationKind, Notice, NoticeCatalog, NoticeKey,
    SharedBoard, SyncError, SyncResult,
};
use crate::task::{
    domain::{ActorId, DriverId, NewTask, Task, TaskId, TaskPatch, TaskStatus},
    ports::{ActorDirectory, ChangeEventBus, NotificationSink, TaskStore},
};
use crate::workflow::{
    domain::{WorkflowCatalog, WorkflowSession, WorkflowSessionId, WorkflowSubmission},
    ports::{ChecklistRecorder, EvidenceStore},
    services::{TransitionGuard, WorkflowPayloadService},
};
use mockable::Clock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

const PRUNE_INTERVAL: Duration = Duration::from_secs(1);

/// Collaborators a client talks to.
pub struct ClientPorts<S, B, W, N, D> {
    /// Authoritative task store.
    pub store: Arc<S>,
    /// Change event bus.
    pub bus: Arc<B>,
    /// Checklist recorder and evidence store.
    pub workflow: Arc<W>,
    /// Notification collaborator.
    pub notifier: Arc<N>,
    /// Actor name lookup.
    pub directory: Arc<D>,
}

/// Client-side synchronization engine for one dispatcher.
///
/// Owns the board and routes every gesture through the guard, the optimistic
/// pipeline or the bulk coordinator. Inbound events are merged by a
/// background reconciler fed by a subscription supervisor; both stop when the
/// client is dropped.
pub struct DispatchClient<S, W, N, C>
where
    S: TaskStore + 'static,
    W: ChecklistRecorder + EvidenceStore + 'static,
    N: NotificationSink,
    C: Clock + Send + Sync + 'static,
{
    actor: ActorId,
    board: SharedBoard,
    store: Arc<S>,
    clock: Arc<C>,
    notices: Arc<NoticeCatalog>,
    policy: ConflictPolicy,
    pipeline: Arc<MutationPipeline<S, C>>,
    bulk: BulkCoordinator<S, C>,
    transitions: TransitionCoordinator<S, C, W, W>,
    notifier: AssignmentNotifier<N>,
    inbox: mpsc::Sender<InboxMessage>,
    freshness: watch::Receiver<Freshness>,
    background: Vec<JoinHandle<()>>,
}

impl<S, W, N, C> DispatchClient<S, W, N, C>
where
    S: TaskStore + 'static,
    W: ChecklistRecorder + EvidenceStore + 'static,
    N: NotificationSink,
    C: Clock + Send + Sync + 'static,
{
    /// Loads the board and starts the background subscription.
    ///
    /// Uses the standard workflow catalog.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] when the initial load fails.
    pub async fn connect<B, D>(
        ports: ClientPorts<S, B, W, N, D>,
        clock: Arc<C>,
        actor: ActorId,
        config: &SyncConfig,
    ) -> SyncResult<Self>
    where
        B: ChangeEventBus + 'static,
        D: ActorDirectory + 'static,
    {
        Self::connect_with_catalog(ports, clock, actor, config, WorkflowCatalog::standard()).await
    }

    /// Loads the board and starts the background subscription with an
    /// explicit workflow catalog.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] when the initial load fails.
    pub async fn connect_with_catalog<B, D>(
        ports: ClientPorts<S, B, W, N, D>,
        clock: Arc<C>,
        actor: ActorId,
        config: &SyncConfig,
        catalog: WorkflowCatalog,
    ) -> SyncResult<Self>
    where
        B: ChangeEventBus + 'static,
        D: ActorDirectory + 'static,
    {
        let ClientPorts {
            store,
            bus,
            workflow,
            notifier,
            directory,
        } = ports;
        let board = SharedBoard::new();
        let notices = Arc::new(NoticeCatalog::new(config.locale.as_str()));
        let policy = ConflictPolicy::from_durations(
            config.conflict_window(),
            config.conflict_indicator_ttl(),
        );

        let reconciler = Reconciler::new(
            Arc::clone(&store),
            directory,
            board.clone(),
            Arc::clone(&notices),
            Arc::clone(&clock),
            actor,
            policy,
        );
        let loaded = reconciler.resync().await?;

        let (inbox, receiver) = mpsc::channel(config.inbox_capacity.max(1));
        let supervisor = SubscriptionSupervisor::new(bus, inbox.clone(), config.reconnect.clone());
        let freshness = supervisor.freshness();
        let background = vec![
            tokio::spawn(reconciler.run(receiver, PRUNE_INTERVAL)),
            tokio::spawn(supervisor.run()),
        ];

        let pipeline = Arc::new(MutationPipeline::new(
            Arc::clone(&store),
            board.clone(),
            Arc::clone(&notices),
            Arc::clone(&clock),
            actor,
        ));
        let bulk = BulkCoordinator::new(
            Arc::clone(&store),
            board.clone(),
            Arc::clone(&notices),
            Arc::clone(&clock),
            actor,
        );
        let transitions = TransitionCoordinator::new(
            TransitionGuard::new(Arc::new(catalog)),
            Arc::clone(&pipeline),
            WorkflowPayloadService::new(Arc::clone(&workflow), workflow),
            board.clone(),
            Arc::clone(&notices),
        );

        tracing::info!(%actor, tasks = loaded, locale = notices.locale(), "dispatch client connected");
        Ok(Self {
            actor,
            board,
            store,
            clock,
            notices,
            policy,
            pipeline,
            bulk,
            transitions,
            notifier: AssignmentNotifier::new(notifier),
            inbox,
            freshness,
            background,
        })
    }

    /// Returns the acting user.
    #[must_use]
    pub const fn actor(&self) -> ActorId {
        self.actor
    }

    /// Runs `f` with read access to the board.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] if the board lock is poisoned.
    pub fn read<R>(&self, f: impl FnOnce(&BoardState) -> R) -> SyncResult<R> {
        self.board.read(f)
    }

    /// Returns a copy of a task as the board currently shows it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] if the board lock is poisoned.
    pub fn task(&self, task_id: TaskId) -> SyncResult<Option<Task>> {
        self.board.read(|board| board.task(task_id).cloned())
    }

    /// Returns a receiver tracking subscription freshness.
    #[must_use]
    pub fn freshness(&self) -> watch::Receiver<Freshness> {
        self.freshness.clone()
    }

    /// Requests a status change, opening a workflow when one is required.
    ///
    /// # Errors
    ///
    /// See [`TransitionCoordinator::request`].
    pub async fn request_status(
        &self,
        task_id: TaskId,
        target: TaskStatus,
    ) -> SyncResult<TransitionOutcome> {
        self.transitions.request(task_id, target).await
    }

    /// Submits the payload of an open workflow.
    ///
    /// # Errors
    ///
    /// See [`TransitionCoordinator::submit`].
    pub async fn submit_workflow(
        &self,
        session_id: WorkflowSessionId,
        submission: WorkflowSubmission,
    ) -> SyncResult<TransitionOutcome> {
        self.transitions.submit(session_id, submission).await
    }

    /// Dismisses an open workflow.
    ///
    /// # Errors
    ///
    /// See [`TransitionCoordinator::cancel`].
    pub fn cancel_workflow(&self, session_id: WorkflowSessionId) -> SyncResult<()> {
        self.transitions.cancel(session_id)
    }

    /// Returns an open workflow session.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] when the session table is
    /// poisoned.
    pub fn workflow_session(
        &self,
        session_id: WorkflowSessionId,
    ) -> SyncResult<Option<WorkflowSession>> {
        self.transitions.session(session_id)
    }

    /// Handles a card dropped on a board column.
    ///
    /// Dropping a card on its own column issues no write. Status drops pass
    /// through the guard like any other status request.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownTask`] for tasks not on the board and any
    /// error of the resulting status change or reassignment.
    pub async fn drop_task(
        &self,
        task_id: TaskId,
        target: DropTarget,
    ) -> SyncResult<TransitionOutcome> {
        let (status, lead) = self
            .board
            .read(|board| {
                board
                    .task(task_id)
                    .map(|task| (task.status(), board.lead_for(task_id)))
            })?
            .ok_or(SyncError::UnknownTask(task_id))?;
        let Some(kind) = target.resolve(status, lead) else {
            tracing::debug!(%task_id, "card dropped on its own column");
            return Ok(TransitionOutcome::Unchanged);
        };
        match kind {
            MutationKind::ChangeStatus { target: next, .. } => {
                self.request_status(task_id, next).await
            }
            MutationKind::ReassignLead(driver_id) => {
                Ok(self.reassign(task_id, driver_id).await?.into())
            }
            other => {
                let outcome = self.pipeline.run(Mutation::new(task_id, other)).await?;
                Ok(outcome.into())
            }
        }
    }

    /// Overwrites task fields.
    ///
    /// Assigned drivers are notified after the store accepts the edit.
    ///
    /// # Errors
    ///
    /// See [`MutationPipeline::run`].
    pub async fn edit_fields(&self, task_id: TaskId, patch: &TaskPatch) -> SyncResult<MutationOutcome> {
        let mutation = Mutation::new(task_id, MutationKind::EditFields(patch.clone()));
        let outcome = self.pipeline.run(mutation).await?;
        if outcome == MutationOutcome::Committed {
            let assignees = self.board.read(|board| {
                board
                    .assignees_for(task_id)
                    .into_iter()
                    .map(|row| row.driver_id)
                    .collect::<Vec<_>>()
            })?;
            self.notifier.task_updated(task_id, assignees, patch).await;
        }
        Ok(outcome)
    }

    /// Makes `driver_id` the lead of a task.
    ///
    /// # Errors
    ///
    /// See [`MutationPipeline::run`].
    pub async fn reassign(&self, task_id: TaskId, driver_id: DriverId) -> SyncResult<MutationOutcome> {
        let previous = self.board.read(|board| board.lead_for(task_id))?;
        let outcome = self
            .pipeline
            .run(Mutation::new(task_id, MutationKind::ReassignLead(driver_id)))
            .await?;
        if outcome == MutationOutcome::Committed {
            self.notifier
                .lead_reassigned(task_id, driver_id, previous)
                .await;
        }
        Ok(outcome)
    }

    /// Soft-deletes a task.
    ///
    /// # Errors
    ///
    /// See [`MutationPipeline::run`].
    pub async fn soft_delete(&self, task_id: TaskId) -> SyncResult<MutationOutcome> {
        self.pipeline
            .run(Mutation::new(task_id, MutationKind::SoftDelete))
            .await
    }

    /// Creates a task and puts the stored record on the board.
    ///
    /// Creation is not optimistic: the store assigns the identifier and the
    /// assignment rows arrive as change events.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] when the store rejects the task.
    pub async fn create_task(
        &self,
        draft: NewTask,
        lead: Option<DriverId>,
        co_drivers: &[DriverId],
    ) -> SyncResult<Task> {
        match self
            .store
            .create_task(draft, lead, co_drivers, self.actor)
            .await
        {
            Ok(task) => {
                let task_id = task.id();
                self.board.write(|board| board.merge_task(task.clone()))?;
                tracing::debug!(%task_id, "task created");
                self.notifier.task_created(&task, lead, co_drivers).await;
                Ok(task)
            }
            Err(err) => {
                tracing::warn!(code = err.code(), error = %err, "task creation failed");
                let mut context = Map::new();
                context.insert("action".to_owned(), Value::from("create_task"));
                let notice = self.notices.render(NoticeKey::WriteFailed, None, &context);
                self.board.write(|board| board.push_notice(notice))?;
                Err(SyncError::Store(err))
            }
        }
    }

    /// Applies `action` to every selected task.
    ///
    /// # Errors
    ///
    /// See [`BulkCoordinator::run`].
    pub async fn bulk(&self, action: BulkAction) -> SyncResult<BulkReport> {
        let selection: Vec<TaskId> = self
            .board
            .read(|board| board.selection().iter().copied().collect())?;
        self.bulk_on(&selection, action).await
    }

    /// Applies `action` to the given tasks.
    ///
    /// # Errors
    ///
    /// See [`BulkCoordinator::run`].
    pub async fn bulk_on(&self, task_ids: &[TaskId], action: BulkAction) -> SyncResult<BulkReport> {
        let previous_leads: HashMap<TaskId, DriverId> = self.board.read(|board| {
            task_ids
                .iter()
                .filter_map(|task_id| board.lead_for(*task_id).map(|lead| (*task_id, lead)))
                .collect()
        })?;
        let report = self.bulk.run(task_ids, action).await?;
        if let BulkAction::Reassign(driver_id) = action {
            for task_id in &report.written {
                self.notifier
                    .lead_reassigned(*task_id, driver_id, previous_leads.get(task_id).copied())
                    .await;
            }
        }
        Ok(report)
    }

    /// Adds a task to the selection. Returns whether it was added.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] if the board lock is poisoned.
    pub fn select(&self, task_id: TaskId) -> SyncResult<bool> {
        self.board.write(|board| board.select(task_id))
    }

    /// Removes a task from the selection. Returns whether it was selected.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] if the board lock is poisoned.
    pub fn deselect(&self, task_id: TaskId) -> SyncResult<bool> {
        self.board.write(|board| board.deselect(task_id))
    }

    /// Clears the selection.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] if the board lock is poisoned.
    pub fn clear_selection(&self) -> SyncResult<()> {
        self.board.write(BoardState::clear_selection)
    }

    /// Hides the conflict indicator of a task. Returns whether one was shown.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] if the board lock is poisoned.
    pub fn dismiss_conflict(&self, task_id: TaskId) -> SyncResult<bool> {
        self.board.write(|board| board.dismiss_conflict(task_id))
    }

    /// Takes every queued notice.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] if the board lock is poisoned.
    pub fn drain_notices(&self) -> SyncResult<Vec<Notice>> {
        self.board.write(BoardState::drain_notices)
    }

    /// Drops expired conflict indicators now instead of on the next tick.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] if the board lock is poisoned.
    pub fn prune_expired(&self) -> SyncResult<usize> {
        let now = self.clock.utc();
        let window = self.policy.window;
        self.board.write(|board| board.prune(now, window))
    }

    /// Asks the reconciler to reload everything from the store.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] when the reconciler has
    /// stopped.
    pub async fn request_resync(&self) -> SyncResult<()> {
        self.inbox
            .send(InboxMessage::Resync)
            .await
            .map_err(|_| SyncError::BoardUnavailable)
    }

    /// Stops the background tasks.
    pub fn shutdown(&mut self) {
        for handle in self.background.drain(..) {
            handle.abort();
        }
    }
}

impl<S, W, N, C> Drop for DispatchClient<S, W, N, C>
where
    S: TaskStore + 'static,
    W: ChecklistRecorder + EvidenceStore + 'static,
    N: NotificationSink,
    C: Clock + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}
