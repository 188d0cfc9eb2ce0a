//! Pure decision logic run before a status transition is requested.

use crate::task::domain::{Task, TaskStatus};
use crate::workflow::domain::{WorkflowCatalog, WorkflowRequirement};
use std::sync::Arc;

/// Outcome of evaluating a requested transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// The task already has the requested status.
    NoChange,
    /// Hand the transition straight to the mutation pipeline.
    Forward,
    /// Defer the transition until the workflow is submitted.
    OpenWorkflow(WorkflowRequirement),
}

/// Decides whether a transition needs a pre-condition workflow first.
///
/// The guard never mutates a task.
#[derive(Debug, Clone)]
pub struct TransitionGuard {
    catalog: Arc<WorkflowCatalog>,
}

impl TransitionGuard {
    /// Creates a guard over `catalog`.
    #[must_use]
    pub const fn new(catalog: Arc<WorkflowCatalog>) -> Self {
        Self { catalog }
    }

    /// Returns the catalog consulted by the guard.
    #[must_use]
    pub fn catalog(&self) -> &WorkflowCatalog {
        &self.catalog
    }

    /// Returns whether [`Self::evaluate`] needs to know whether evidence
    /// from a prior attempt exists.
    #[must_use]
    pub fn needs_evidence_check(&self, task: &Task, target: TaskStatus) -> bool {
        Self::completion_reachable(task, target)
            && self.catalog.needs_evidence_check(task.kind(), target)
    }

    /// Evaluates a requested transition of `task` to `target`.
    ///
    /// A completion request from any status other than `in_progress` is
    /// forwarded without collecting a payload, so the store's rejection
    /// reaches the user instead of a workflow that cannot succeed.
    #[must_use]
    pub fn evaluate(&self, task: &Task, target: TaskStatus, evidence_present: bool) -> GuardDecision {
        let current = task.status();
        if current == target {
            return GuardDecision::NoChange;
        }
        if !Self::completion_reachable(task, target) {
            return GuardDecision::Forward;
        }
        self.catalog
            .requirement_for(task.kind(), current, target, evidence_present)
            .map_or(GuardDecision::Forward, GuardDecision::OpenWorkflow)
    }

    fn completion_reachable(task: &Task, target: TaskStatus) -> bool {
        target != TaskStatus::Completed || task.status().store_accepts(target)
    }
}
