//! Fan-out of one user intent over many selected tasks.

use super::pipeline::dispatch;
use crate::sync::domain::{
    Mutation, MutationKind, NoticeCatalog, NoticeKey, SharedBoard, SyncError, SyncResult,
};
use crate::task::{
    domain::{ActorId, DriverId, TaskId, TaskPriority},
    ports::{TaskStore, TaskStoreError},
};
use futures::future::join_all;
use mockable::Clock;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Change applied to every selected task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkAction {
    /// Make one driver the lead of every task.
    Reassign(DriverId),
    /// Set the same priority on every task.
    ChangePriority(TaskPriority),
    /// Soft-delete every task.
    Delete,
}

impl BulkAction {
    fn mutation_kind(self) -> MutationKind {
        match self {
            Self::Reassign(driver_id) => MutationKind::ReassignLead(driver_id),
            Self::ChangePriority(priority) => MutationKind::priority(priority),
            Self::Delete => MutationKind::SoftDelete,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Reassign(_) => "reassign",
            Self::ChangePriority(_) => "change_priority",
            Self::Delete => "delete",
        }
    }
}

/// Summary of a successful bulk operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReport {
    /// Tasks a write was sent for.
    pub written: Vec<TaskId>,
    /// Tasks that already matched and were left alone.
    pub skipped: Vec<TaskId>,
}

/// Applies one action to many tasks and rolls back all of them if any
/// write fails.
///
/// The writes are independent at the store; a failed batch can leave the
/// successful members changed server-side until their events arrive.
pub struct BulkCoordinator<S, C>
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

impl<S, C> BulkCoordinator<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a coordinator writing on behalf of `actor`.
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

    /// Runs `action` over `task_ids`.
    ///
    /// Deleting clears the selection on success; the other actions keep it.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::EmptySelection`], [`SyncError::UnknownTask`] or
    /// [`SyncError::Busy`] before anything changes, and
    /// [`SyncError::PartialBulkFailure`] after the whole batch was rolled
    /// back.
    pub async fn run(&self, task_ids: &[TaskId], action: BulkAction) -> SyncResult<BulkReport> {
        if task_ids.is_empty() {
            return Err(SyncError::EmptySelection);
        }
        let now = self.clock.utc();
        let kind = action.mutation_kind();

        let (mutations, skipped, snapshot) = self.board.write(|board| {
            let mut mutations = Vec::new();
            let mut skipped = Vec::new();
            for task_id in dedup(task_ids) {
                if board.task(task_id).is_none() {
                    return Err(SyncError::UnknownTask(task_id));
                }
                let mutation = Mutation::new(task_id, kind.clone());
                if board.is_noop(&mutation) {
                    skipped.push(task_id);
                } else if board.is_busy(task_id, mutation.lane()) {
                    return Err(SyncError::Busy {
                        task_id,
                        lane: mutation.lane(),
                    });
                } else {
                    mutations.push(mutation);
                }
            }
            let snapshot = board.snapshot(&mutations);
            for mutation in &mutations {
                board.begin(mutation.task_id(), mutation.lane())?;
                board.apply_local(mutation, now)?;
            }
            Ok((mutations, skipped, snapshot))
        })??;

        if mutations.is_empty() {
            return Ok(BulkReport {
                written: Vec::new(),
                skipped,
            });
        }

        let results = join_all(
            mutations
                .iter()
                .map(|mutation| dispatch(self.store.as_ref(), mutation, self.actor)),
        )
        .await;

        let total = mutations.len();
        let failures: Vec<(TaskId, TaskStoreError)> = mutations
            .iter()
            .zip(results)
            .filter_map(|(mutation, result)| result.err().map(|err| (mutation.task_id(), err)))
            .collect();

        let written: Vec<TaskId> = mutations.iter().map(Mutation::task_id).collect();
        if failures.is_empty() {
            let mut context = Map::new();
            context.insert("count".to_owned(), Value::from(total));
            let notice = self.notices.render(NoticeKey::BulkSucceeded, None, &context);
            self.board.write(|board| {
                for mutation in &mutations {
                    board.finish(mutation.task_id(), mutation.lane());
                }
                if action == BulkAction::Delete {
                    board.clear_selection();
                }
                board.push_notice(notice);
            })?;
            tracing::info!(action = action.name(), total, "bulk operation committed");
            return Ok(BulkReport { written, skipped });
        }

        for (task_id, err) in &failures {
            tracing::warn!(
                %task_id,
                action = action.name(),
                code = err.code(),
                error = %err,
                "bulk member write failed"
            );
        }
        let error = self.board.write(|board| {
            let restored = board.restore(snapshot);
            for mutation in &mutations {
                board.finish(mutation.task_id(), mutation.lane());
            }
            let error = SyncError::PartialBulkFailure {
                failed: failures.len(),
                total,
                restored,
                failures,
            };
            if let Some(rendered) = self.notices.for_error(&error) {
                board.push_notice(rendered);
            }
            error
        })?;
        tracing::warn!(action = action.name(), total, "bulk operation rolled back");
        Err(error)
    }
}

fn dedup(task_ids: &[TaskId]) -> Vec<TaskId> {
    let mut seen = std::collections::HashSet::new();
    task_ids
        .iter()
        .copied()
        .filter(|task_id| seen.insert(*task_id))
        .collect()
}
