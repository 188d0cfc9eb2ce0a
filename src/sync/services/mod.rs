//! Client services: the optimistic pipeline, bulk fan-out, guarded status
//! requests, event reconciliation and the subscription supervisor, wired
//! together by [`DispatchClient`].

mod bulk;
mod client;
mod notify;
mod pipeline;
mod reconciler;
mod subscription;
mod transition;

pub use bulk::{BulkAction, BulkCoordinator, BulkReport};
pub use client::{ClientPorts, DispatchClient};
pub use notify::AssignmentNotifier;
pub use pipeline::{MutationOutcome, MutationPipeline};
pub use reconciler::{ConflictPolicy, InboxMessage, Reconciler};
pub use subscription::SubscriptionSupervisor;
pub use transition::{TransitionCoordinator, TransitionOutcome};
