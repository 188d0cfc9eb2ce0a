//! Domain model for pre-condition workflows.
//!
//! A workflow collects a payload (checklist answers, photos and a signature,
//! or a short note) that must be stored before a gated status transition is
//! requested. The catalog maps each task classification to the workflows it
//! requires; sessions track one opened workflow from open to submission or
//! dismissal.

mod catalog;
mod checklist;
mod completion_form;
mod error;
mod popup;
mod session;

pub use catalog::{CompletionWorkflow, WorkflowCatalog, WorkflowPlan, WorkflowRequirement};
pub use checklist::{
    ChecklistField, ChecklistFieldType, ChecklistSchema, ChecklistValues, ValidatedChecklist,
};
pub use completion_form::{
    CompletionFormDraft, CompletionFormSpec, CompletionFormStep, PhotoCapture, SignatureCapture,
};
pub use error::WorkflowDomainError;
pub use popup::{CompletionNote, CompletionPopupSpec};
pub use session::{
    WorkflowSession, WorkflowSessionId, WorkflowSessionState, WorkflowSubmission,
};
