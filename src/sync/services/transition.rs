//! Status requests routed through the transition guard.

use super::pipeline::{MutationOutcome, MutationPipeline};
use crate::sync::domain::{
    Mutation, MutationKind, NoticeCatalog, NoticeKey, SharedBoard, SyncError, SyncResult,
};
use crate::task::{
    domain::{TaskId, TaskStatus},
    ports::TaskStore,
};
use crate::workflow::{
    domain::{WorkflowSession, WorkflowSessionId, WorkflowSubmission},
    ports::{ChecklistRecorder, EvidenceStore},
    services::{GuardDecision, TransitionGuard, WorkflowPayloadError, WorkflowPayloadService},
};
use mockable::Clock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Result of a status request or workflow submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Nothing needed to change.
    Unchanged,
    /// The status change was written.
    Committed,
    /// A workflow must be submitted before the status changes.
    WorkflowOpened(WorkflowSession),
}

/// Runs status requests through the guard and owns open workflow sessions.
///
/// A gated status call is issued only after the workflow payload was stored.
pub struct TransitionCoordinator<S, C, R, E>
where
    S: TaskStore,
    C: Clock + Send + Sync,
    R: ChecklistRecorder,
    E: EvidenceStore,
{
    guard: TransitionGuard,
    pipeline: Arc<MutationPipeline<S, C>>,
    payloads: WorkflowPayloadService<R, E>,
    board: SharedBoard,
    notices: Arc<NoticeCatalog>,
    sessions: Mutex<HashMap<WorkflowSessionId, WorkflowSession>>,
}

impl<S, C, R, E> TransitionCoordinator<S, C, R, E>
where
    S: TaskStore,
    C: Clock + Send + Sync,
    R: ChecklistRecorder,
    E: EvidenceStore,
{
    /// Creates a coordinator.
    #[must_use]
    pub fn new(
        guard: TransitionGuard,
        pipeline: Arc<MutationPipeline<S, C>>,
        payloads: WorkflowPayloadService<R, E>,
        board: SharedBoard,
        notices: Arc<NoticeCatalog>,
    ) -> Self {
        Self {
            guard,
            pipeline,
            payloads,
            board,
            notices,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Requests a move of `task_id` to `target`.
    ///
    /// Opening a workflow replaces any earlier session for the same task.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownTask`] for tasks not on the board and
    /// whatever the mutation pipeline returns for forwarded transitions.
    pub async fn request(&self, task_id: TaskId, target: TaskStatus) -> SyncResult<TransitionOutcome> {
        let task = self
            .board
            .read(|board| board.task(task_id).cloned())?
            .ok_or(SyncError::UnknownTask(task_id))?;

        let evidence_present = if self.guard.needs_evidence_check(&task, target) {
            self.payloads
                .evidence()
                .has_evidence(task_id)
                .await
                .unwrap_or_else(|err| {
                    tracing::warn!(%task_id, error = %err, "evidence lookup failed");
                    false
                })
        } else {
            false
        };

        match self.guard.evaluate(&task, target, evidence_present) {
            GuardDecision::NoChange => Ok(TransitionOutcome::Unchanged),
            GuardDecision::Forward => {
                let mutation = Mutation::new(task_id, MutationKind::status(target));
                Ok(self.pipeline.run(mutation).await?.into())
            }
            GuardDecision::OpenWorkflow(requirement) => {
                let kind = requirement.kind_name();
                let session = WorkflowSession::open(task_id, target, requirement);
                let mut sessions = self.lock_sessions()?;
                sessions.retain(|_, open| open.task_id() != task_id);
                sessions.insert(session.id(), session.clone());
                tracing::debug!(
                    %task_id,
                    session_id = %session.id(),
                    workflow = kind,
                    target = target.as_str(),
                    "workflow opened"
                );
                Ok(TransitionOutcome::WorkflowOpened(session))
            }
        }
    }

    /// Submits a workflow payload and, once it is stored, the status change.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownSession`] for unknown sessions,
    /// [`SyncError::WorkflowInvalid`] when the payload fails validation (the
    /// session reopens), [`SyncError::WorkflowPersistence`] when storing it
    /// fails (the session becomes dismissible) and any pipeline error for the
    /// status call itself.
    pub async fn submit(
        &self,
        session_id: WorkflowSessionId,
        submission: WorkflowSubmission,
    ) -> SyncResult<TransitionOutcome> {
        let session =
            self.with_session(session_id, |open| open.begin_submission().map(|()| open.clone()))??;
        let task_id = session.task_id();

        let extras = match self
            .payloads
            .persist(&session, &submission, self.pipeline.actor())
            .await
        {
            Ok(extras) => extras,
            Err(WorkflowPayloadError::Invalid(err)) => {
                self.with_session(session_id, WorkflowSession::reopen)?;
                return Err(SyncError::WorkflowInvalid(err));
            }
            Err(WorkflowPayloadError::Persistence(err)) => {
                tracing::warn!(
                    %task_id,
                    %session_id,
                    workflow = submission.kind_name(),
                    error = %err,
                    "workflow payload not stored; status unchanged"
                );
                let reason = err.to_string();
                self.with_session(session_id, |open| open.record_failure(reason))?;
                let notice = self
                    .notices
                    .plain(NoticeKey::WorkflowPersistenceFailed, Some(task_id));
                self.board.write(|board| board.push_notice(notice))?;
                return Err(SyncError::WorkflowPersistence(err));
            }
        };

        let mutation = Mutation::new(
            task_id,
            MutationKind::ChangeStatus {
                target: session.target(),
                extras,
            },
        );
        match self.pipeline.run(mutation).await {
            Ok(outcome) => {
                self.with_session(session_id, WorkflowSession::record_completion)?;
                self.lock_sessions()?.remove(&session_id);
                Ok(outcome.into())
            }
            Err(err) => {
                let reason = err.to_string();
                self.with_session(session_id, |open| open.record_failure(reason))?;
                Err(err)
            }
        }
    }

    /// Dismisses a workflow without changing the task.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownSession`] for unknown sessions and
    /// [`SyncError::WorkflowInvalid`] when the session cannot be dismissed.
    pub fn cancel(&self, session_id: WorkflowSessionId) -> SyncResult<()> {
        self.with_session(session_id, WorkflowSession::dismiss)??;
        self.lock_sessions()?.remove(&session_id);
        tracing::debug!(%session_id, "workflow dismissed");
        Ok(())
    }

    /// Returns a copy of an open session.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::BoardUnavailable`] when the session table is
    /// poisoned.
    pub fn session(&self, session_id: WorkflowSessionId) -> SyncResult<Option<WorkflowSession>> {
        Ok(self.lock_sessions()?.get(&session_id).cloned())
    }

    fn with_session<T>(
        &self,
        session_id: WorkflowSessionId,
        f: impl FnOnce(&mut WorkflowSession) -> T,
    ) -> SyncResult<T> {
        let mut sessions = self.lock_sessions()?;
        let session = sessions
            .get_mut(&session_id)
            .ok_or(SyncError::UnknownSession(session_id))?;
        Ok(f(session))
    }

    fn lock_sessions(
        &self,
    ) -> SyncResult<std::sync::MutexGuard<'_, HashMap<WorkflowSessionId, WorkflowSession>>> {
        self.sessions.lock().map_err(|_| SyncError::BoardUnavailable)
    }
}

impl From<MutationOutcome> for TransitionOutcome {
    fn from(outcome: MutationOutcome) -> Self {
        match outcome {
            MutationOutcome::Committed => Self::Committed,
            MutationOutcome::Skipped => Self::Unchanged,
        }
    }
}
