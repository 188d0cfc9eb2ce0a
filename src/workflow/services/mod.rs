//! Service layer for the transition guard and workflow payload storage.

mod guard;
mod payload;

pub use guard::{GuardDecision, TransitionGuard};
pub use payload::{WorkflowPayloadError, WorkflowPayloadResult, WorkflowPayloadService};
