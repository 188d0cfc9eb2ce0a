//! Lifecycle of one opened pre-condition workflow.

use super::{ChecklistValues, CompletionFormDraft, WorkflowDomainError, WorkflowRequirement};
use crate::task::domain::{TaskId, TaskStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of an opened workflow session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowSessionId(Uuid);

impl WorkflowSessionId {
    /// Generates a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkflowSessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WorkflowSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of a workflow session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowSessionState {
    /// Awaiting user input.
    Open,
    /// Payload persistence or the status call is in flight.
    Persisting,
    /// The last submission failed; the user may retry or dismiss.
    Failed {
        /// Failure description shown inline.
        reason: String,
    },
    /// Dismissed without a status change.
    Cancelled,
    /// Payload stored and status call accepted.
    Completed,
}

impl WorkflowSessionState {
    /// Returns the state name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Persisting => "persisting",
            Self::Failed { .. } => "failed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }

    /// Returns whether the session has ended.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed)
    }
}

impl fmt::Display for WorkflowSessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload submitted to close a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowSubmission {
    /// Checklist answers.
    Checklist(ChecklistValues),
    /// Completed photo and signature capture.
    CompletionForm(CompletionFormDraft),
    /// Popup note text.
    CompletionNote(String),
}

impl WorkflowSubmission {
    /// Returns the submission kind name.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Checklist(_) => "checklist",
            Self::CompletionForm(_) => "completion_form",
            Self::CompletionNote(_) => "completion_note",
        }
    }
}

/// Pre-condition workflow opened for one requested transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSession {
    id: WorkflowSessionId,
    task_id: TaskId,
    target: TaskStatus,
    requirement: WorkflowRequirement,
    state: WorkflowSessionState,
}

impl WorkflowSession {
    /// Opens a session for a deferred transition.
    #[must_use]
    pub fn open(task_id: TaskId, target: TaskStatus, requirement: WorkflowRequirement) -> Self {
        Self {
            id: WorkflowSessionId::new(),
            task_id,
            target,
            requirement,
            state: WorkflowSessionState::Open,
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub const fn id(&self) -> WorkflowSessionId {
        self.id
    }

    /// Returns the gated task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the deferred target status.
    #[must_use]
    pub const fn target(&self) -> TaskStatus {
        self.target
    }

    /// Returns the workflow being collected.
    #[must_use]
    pub const fn requirement(&self) -> &WorkflowRequirement {
        &self.requirement
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> &WorkflowSessionState {
        &self.state
    }

    /// Returns whether the user may dismiss the session now.
    ///
    /// Forced workflows become dismissible only after a failed submission.
    #[must_use]
    pub const fn can_dismiss(&self) -> bool {
        match self.state {
            WorkflowSessionState::Open => !self.requirement.force_completion(),
            WorkflowSessionState::Failed { .. } => true,
            WorkflowSessionState::Persisting
            | WorkflowSessionState::Cancelled
            | WorkflowSessionState::Completed => false,
        }
    }

    /// Moves the session into `Persisting`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::SubmissionInFlight`] while a submission
    /// is running and [`WorkflowDomainError::SessionClosed`] once ended.
    pub fn begin_submission(&mut self) -> Result<(), WorkflowDomainError> {
        match self.state {
            WorkflowSessionState::Open | WorkflowSessionState::Failed { .. } => {
                self.state = WorkflowSessionState::Persisting;
                Ok(())
            }
            WorkflowSessionState::Persisting => Err(WorkflowDomainError::SubmissionInFlight),
            WorkflowSessionState::Cancelled | WorkflowSessionState::Completed => {
                Err(WorkflowDomainError::SessionClosed(self.state.clone()))
            }
        }
    }

    /// Records a rejected submission so the user can retry or dismiss.
    pub fn record_failure(&mut self, reason: impl Into<String>) {
        if self.state == WorkflowSessionState::Persisting {
            self.state = WorkflowSessionState::Failed {
                reason: reason.into(),
            };
        }
    }

    /// Returns a submission that failed validation to the open state.
    pub fn reopen(&mut self) {
        if self.state == WorkflowSessionState::Persisting {
            self.state = WorkflowSessionState::Open;
        }
    }

    /// Records a successful submission.
    pub fn record_completion(&mut self) {
        if self.state == WorkflowSessionState::Persisting {
            self.state = WorkflowSessionState::Completed;
        }
    }

    /// Dismisses the session without issuing a status change.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowDomainError::ForcedCompletion`] for an open forced
    /// workflow, [`WorkflowDomainError::SubmissionInFlight`] while persisting
    /// and [`WorkflowDomainError::SessionClosed`] once ended.
    pub fn dismiss(&mut self) -> Result<(), WorkflowDomainError> {
        match self.state {
            WorkflowSessionState::Persisting => Err(WorkflowDomainError::SubmissionInFlight),
            WorkflowSessionState::Cancelled | WorkflowSessionState::Completed => {
                Err(WorkflowDomainError::SessionClosed(self.state.clone()))
            }
            _ if !self.can_dismiss() => Err(WorkflowDomainError::ForcedCompletion),
            _ => {
                self.state = WorkflowSessionState::Cancelled;
                Ok(())
            }
        }
    }
}
