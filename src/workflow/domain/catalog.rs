//! Classification to workflow lookup.

use super::{
    ChecklistField, ChecklistSchema, CompletionFormSpec, CompletionPopupSpec,
};
use crate::task::domain::{TaskKind, TaskStatus};
use std::collections::HashMap;

/// Pre-condition workflow required before a status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowRequirement {
    /// Start checklist gating the move into `in_progress`.
    StartChecklist(ChecklistSchema),
    /// Completion checklist gating the move into `completed`.
    CompletionChecklist(ChecklistSchema),
    /// Photo and signature capture gating the move into `completed`.
    CompletionForm(CompletionFormSpec),
    /// Short note gating the move into `completed`.
    CompletionPopup(CompletionPopupSpec),
}

impl WorkflowRequirement {
    /// Returns the workflow name used in logs and errors.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::StartChecklist(_) => "start_checklist",
            Self::CompletionChecklist(_) => "completion_checklist",
            Self::CompletionForm(_) => "completion_form",
            Self::CompletionPopup(_) => "completion_popup",
        }
    }

    /// Returns whether the workflow blocks dismissal before submission.
    #[must_use]
    pub const fn force_completion(&self) -> bool {
        match self {
            Self::StartChecklist(schema) | Self::CompletionChecklist(schema) => {
                schema.force_completion()
            }
            Self::CompletionForm(spec) => spec.force_completion,
            Self::CompletionPopup(spec) => spec.force_completion,
        }
    }
}

/// Workflow that gates completion for a classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CompletionWorkflow {
    /// Direct transition.
    #[default]
    None,
    /// Completion checklist.
    Checklist(ChecklistSchema),
    /// Completion form.
    Form(CompletionFormSpec),
    /// Completion popup.
    Popup(CompletionPopupSpec),
}

/// Workflows configured for one classification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowPlan {
    start_checklist: Option<ChecklistSchema>,
    completion: CompletionWorkflow,
}

impl WorkflowPlan {
    /// Creates a plan with no workflows.
    #[must_use]
    pub const fn direct() -> Self {
        Self {
            start_checklist: None,
            completion: CompletionWorkflow::None,
        }
    }

    /// Sets the start checklist.
    #[must_use]
    pub fn with_start_checklist(mut self, schema: ChecklistSchema) -> Self {
        self.start_checklist = Some(schema);
        self
    }

    /// Sets the completion workflow.
    #[must_use]
    pub fn with_completion(mut self, completion: CompletionWorkflow) -> Self {
        self.completion = completion;
        self
    }

    /// Returns the start checklist.
    #[must_use]
    pub const fn start_checklist(&self) -> Option<&ChecklistSchema> {
        self.start_checklist.as_ref()
    }

    /// Returns the completion workflow.
    #[must_use]
    pub const fn completion(&self) -> &CompletionWorkflow {
        &self.completion
    }
}

/// Lookup from task classification to its workflow plan.
#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
    plans: HashMap<TaskKind, WorkflowPlan>,
}

impl WorkflowCatalog {
    /// Creates a catalog in which every classification transitions directly.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates the catalog used by dispatch operations.
    #[must_use]
    pub fn standard() -> Self {
        let vehicle_condition = ChecklistSchema::new("vehicle_condition")
            .with_field(ChecklistField::checkbox("exterior_checked", "Exterior inspected"))
            .with_field(ChecklistField::checkbox("fuel_level_noted", "Fuel level noted"))
            .with_field(ChecklistField::text("odometer", "Odometer reading", true))
            .with_field(ChecklistField::text("damage_notes", "Existing damage", false));

        let test_start = ChecklistSchema::new("test_drive_start")
            .with_field(ChecklistField::checkbox("licence_verified", "Licence verified"))
            .with_field(ChecklistField::checkbox("route_briefed", "Route briefed"));

        let test_completion = ChecklistSchema::new("test_drive_completion")
            .with_field(ChecklistField::checkbox("vehicle_returned", "Vehicle returned"))
            .with_field(ChecklistField::checkbox("keys_returned", "Keys returned"))
            .with_field(ChecklistField::text("feedback", "Customer feedback", false))
            .skippable_with_evidence();

        Self::empty()
            .with_plan(
                TaskKind::Pickup,
                WorkflowPlan::direct()
                    .with_start_checklist(vehicle_condition)
                    .with_completion(CompletionWorkflow::Form(CompletionFormSpec {
                        min_photos: 2,
                        require_signature: true,
                        force_completion: true,
                    })),
            )
            .with_plan(
                TaskKind::Delivery,
                WorkflowPlan::direct().with_completion(CompletionWorkflow::Form(
                    CompletionFormSpec {
                        min_photos: 1,
                        require_signature: true,
                        force_completion: false,
                    },
                )),
            )
            .with_plan(
                TaskKind::Test,
                WorkflowPlan::direct()
                    .with_start_checklist(test_start)
                    .with_completion(CompletionWorkflow::Checklist(test_completion)),
            )
            .with_plan(
                TaskKind::Rescue,
                WorkflowPlan::direct().with_completion(CompletionWorkflow::Popup(
                    CompletionPopupSpec {
                        prompt: "Describe the outcome of the rescue".to_owned(),
                        required: true,
                        max_chars: 500,
                        force_completion: false,
                    },
                )),
            )
    }

    /// Registers or replaces the plan for a classification.
    #[must_use]
    pub fn with_plan(mut self, kind: TaskKind, plan: WorkflowPlan) -> Self {
        self.plans.insert(kind, plan);
        self
    }

    /// Returns the plan for a classification.
    #[must_use]
    pub fn plan(&self, kind: TaskKind) -> Option<&WorkflowPlan> {
        self.plans.get(&kind)
    }

    /// Returns whether resolving a transition needs to know about prior
    /// evidence.
    #[must_use]
    pub fn needs_evidence_check(&self, kind: TaskKind, target: TaskStatus) -> bool {
        if target != TaskStatus::Completed {
            return false;
        }
        matches!(
            self.plan(kind).map(WorkflowPlan::completion),
            Some(CompletionWorkflow::Checklist(schema)) if schema.is_skippable_with_evidence()
        )
    }

    /// Resolves the workflow gating a move from `current` to `target`.
    ///
    /// The start checklist gates every move into `in_progress`, including
    /// resuming a blocked task. A skippable completion checklist is waived
    /// when `evidence_present` is set.
    #[must_use]
    pub fn requirement_for(
        &self,
        kind: TaskKind,
        current: TaskStatus,
        target: TaskStatus,
        evidence_present: bool,
    ) -> Option<WorkflowRequirement> {
        let plan = self.plan(kind)?;
        match target {
            TaskStatus::InProgress if current != TaskStatus::InProgress => plan
                .start_checklist()
                .cloned()
                .map(WorkflowRequirement::StartChecklist),
            TaskStatus::Completed => match plan.completion() {
                CompletionWorkflow::None => None,
                CompletionWorkflow::Checklist(schema)
                    if schema.is_skippable_with_evidence() && evidence_present =>
                {
                    None
                }
                CompletionWorkflow::Checklist(schema) => {
                    Some(WorkflowRequirement::CompletionChecklist(schema.clone()))
                }
                CompletionWorkflow::Form(spec) => Some(WorkflowRequirement::CompletionForm(*spec)),
                CompletionWorkflow::Popup(spec) => {
                    Some(WorkflowRequirement::CompletionPopup(spec.clone()))
                }
            },
            _ => None,
        }
    }
}
