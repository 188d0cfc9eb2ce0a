//! Validates and stores workflow payloads ahead of the gated status call.

use crate::task::{domain::ActorId, ports::StatusExtras};
use crate::workflow::{
    domain::{WorkflowDomainError, WorkflowRequirement, WorkflowSession, WorkflowSubmission},
    ports::{ChecklistRecorder, EvidenceStore, WorkflowPersistenceError},
};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;

/// Errors returned while persisting a workflow payload.
#[derive(Debug, Clone, Error)]
pub enum WorkflowPayloadError {
    /// The payload failed validation; nothing was stored.
    #[error(transparent)]
    Invalid(#[from] WorkflowDomainError),

    /// A storage call failed.
    #[error(transparent)]
    Persistence(#[from] WorkflowPersistenceError),
}

/// Result type for payload operations.
pub type WorkflowPayloadResult<T> = Result<T, WorkflowPayloadError>;

/// Stores workflow payloads through the checklist and evidence ports.
#[derive(Clone)]
pub struct WorkflowPayloadService<R, E>
where
    R: ChecklistRecorder,
    E: EvidenceStore,
{
    recorder: Arc<R>,
    evidence: Arc<E>,
}

impl<R, E> WorkflowPayloadService<R, E>
where
    R: ChecklistRecorder,
    E: EvidenceStore,
{
    /// Creates a payload service.
    #[must_use]
    pub const fn new(recorder: Arc<R>, evidence: Arc<E>) -> Self {
        Self { recorder, evidence }
    }

    /// Returns the evidence store.
    #[must_use]
    pub const fn evidence(&self) -> &Arc<E> {
        &self.evidence
    }

    /// Validates `submission` against the session's workflow and stores it.
    ///
    /// Returns the extra fields to attach to the status call. Completion
    /// forms upload every photo before the signature record is written.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowPayloadError::Invalid`] when the submission does not
    /// match the workflow or fails validation, and
    /// [`WorkflowPayloadError::Persistence`] when a storage call fails.
    pub async fn persist(
        &self,
        session: &WorkflowSession,
        submission: &WorkflowSubmission,
        actor: ActorId,
    ) -> WorkflowPayloadResult<StatusExtras> {
        let task_id = session.task_id();
        let mut extras = StatusExtras::new();
        match (session.requirement(), submission) {
            (
                WorkflowRequirement::StartChecklist(schema)
                | WorkflowRequirement::CompletionChecklist(schema),
                WorkflowSubmission::Checklist(values),
            ) => {
                let checklist = schema.validate(values)?;
                let receipt = self.recorder.submit(task_id, &checklist, actor).await?;
                extras.insert("checklist".to_owned(), Value::String(schema.name().to_owned()));
                extras.insert(
                    "checklist_submission_id".to_owned(),
                    Value::String(receipt.id.to_string()),
                );
            }
            (WorkflowRequirement::CompletionForm(spec), WorkflowSubmission::CompletionForm(draft)) => {
                spec.validate(draft)?;
                let mut keys = Vec::with_capacity(draft.photos().len());
                for photo in draft.photos() {
                    keys.push(self.evidence.store_photo(task_id, photo).await?);
                }
                if let Some(signature) = draft.signature() {
                    let receipt = self
                        .evidence
                        .store_signature(task_id, signature, &keys, actor)
                        .await?;
                    extras.insert(
                        "signature_id".to_owned(),
                        Value::String(receipt.id.to_string()),
                    );
                }
                extras.insert(
                    "evidence_photos".to_owned(),
                    json!(keys.iter().map(|key| key.as_str()).collect::<Vec<_>>()),
                );
            }
            (WorkflowRequirement::CompletionPopup(spec), WorkflowSubmission::CompletionNote(note)) => {
                if let Some(note) = spec.validate(note)? {
                    extras.insert(
                        "completion_note".to_owned(),
                        Value::String(note.as_str().to_owned()),
                    );
                }
            }
            (requirement, other) => {
                return Err(WorkflowDomainError::SubmissionMismatch {
                    expected: requirement.kind_name(),
                    submitted: other.kind_name(),
                }
                .into());
            }
        }
        tracing::debug!(
            %task_id,
            workflow = session.requirement().kind_name(),
            "workflow payload stored"
        );
        Ok(extras)
    }
}
