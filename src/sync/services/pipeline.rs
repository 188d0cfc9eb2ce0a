//! Snapshot, apply locally, send, and roll back on failure.

use crate::sync::domain::{
    Mutation, MutationKind, NoticeCatalog, SharedBoard, Snapshot, SyncError, SyncResult,
};
use crate::task::{
    domain::ActorId,
    ports::{TaskStore, TaskStoreResult},
};
use mockable::Clock;
use std::sync::Arc;

/// Result of running one mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The store accepted the write; the optimistic state stays in place.
    Committed,
    /// The mutation would change nothing and no write was issued.
    Skipped,
}

/// Runs every single-task mutation through the optimistic protocol.
///
/// The board lock is only held while snapshotting, applying and rolling
/// back; the store call runs without it so inbound events keep flowing.
pub struct MutationPipeline<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    board: SharedBoard,
    notices: Arc<NoticeCatalog>,
    clock: Arc<C>,
    actor: ActorId,
}

impl<S, C> MutationPipeline<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a pipeline writing on behalf of `actor`.
    #[must_use]
    pub const fn new(
        store: Arc<S>,
        board: SharedBoard,
        notices: Arc<NoticeCatalog>,
        clock: Arc<C>,
        actor: ActorId,
    ) -> Self {
        Self {
            store,
            board,
            notices,
            clock,
            actor,
        }
    }

    /// Returns the acting user.
    #[must_use]
    pub const fn actor(&self) -> ActorId {
        self.actor
    }

    /// Applies `mutation` to the board, sends it to the store and resolves.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownTask`] or [`SyncError::Busy`] before
    /// anything changes, and [`SyncError::GuardedTransition`] or
    /// [`SyncError::WriteFailed`] after the board was rolled back to the
    /// pre-mutation snapshot. Rejections queue a notice on the board.
    pub async fn run(&self, mutation: Mutation) -> SyncResult<MutationOutcome> {
        let task_id = mutation.task_id();
        let lane = mutation.lane();
        let Some(snapshot) = self.prepare(&mutation)? else {
            tracing::debug!(%task_id, lane = %lane, "mutation changes nothing; skipped");
            return Ok(MutationOutcome::Skipped);
        };

        match dispatch(self.store.as_ref(), &mutation, self.actor).await {
            Ok(()) => {
                self.board.write(|board| board.finish(task_id, lane))?;
                tracing::debug!(
                    %task_id,
                    mutation_id = %mutation.id(),
                    operation = mutation.kind().name(),
                    "write committed"
                );
                Ok(MutationOutcome::Committed)
            }
            Err(err) => {
                tracing::warn!(
                    %task_id,
                    mutation_id = %mutation.id(),
                    operation = mutation.kind().name(),
                    code = err.code(),
                    error = %err,
                    "write failed; rolling back"
                );
                let error = SyncError::from_write(task_id, mutation.kind().name(), err);
                let notice = self.notices.for_error(&error);
                self.board.write(|board| {
                    board.restore(snapshot);
                    board.finish(task_id, lane);
                    if let Some(rendered) = notice {
                        board.push_notice(rendered);
                    }
                })?;
                Err(error)
            }
        }
    }

    fn prepare(&self, mutation: &Mutation) -> SyncResult<Option<Snapshot>> {
        let task_id = mutation.task_id();
        let lane = mutation.lane();
        let now = self.clock.utc();
        self.board.write(|board| {
            if board.task(task_id).is_none() {
                return Err(SyncError::UnknownTask(task_id));
            }
            if board.is_noop(mutation) {
                return Ok(None);
            }
            if let Err(err) = board.begin(task_id, lane) {
                if let Some(notice) = self.notices.for_error(&err) {
                    board.push_notice(notice);
                }
                return Err(err);
            }
            let snapshot = board.snapshot(std::slice::from_ref(mutation));
            if let Err(err) = board.apply_local(mutation, now) {
                board.finish(task_id, lane);
                return Err(err);
            }
            Ok(Some(snapshot))
        })?
    }
}

/// Sends the store call matching a mutation.
pub(crate) async fn dispatch<S>(store: &S, mutation: &Mutation, actor: ActorId) -> TaskStoreResult<()>
where
    S: TaskStore + ?Sized,
{
    let task_id = mutation.task_id();
    match mutation.kind() {
        MutationKind::ChangeStatus { target, extras } => {
            store.update_task_status(task_id, *target, actor, extras).await
        }
        MutationKind::EditFields(patch) => store.update_task(task_id, patch, actor).await.map(|_| ()),
        MutationKind::ReassignLead(driver_id) => store.reassign_lead(task_id, *driver_id, actor).await,
        MutationKind::SoftDelete => store.soft_delete_task(task_id, actor).await,
    }
}
