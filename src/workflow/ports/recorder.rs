//! Persistence ports for workflow payloads.

use crate::task::domain::{ActorId, TaskId};
use crate::workflow::domain::{PhotoCapture, SignatureCapture, ValidatedChecklist};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Result type for workflow persistence operations.
pub type WorkflowPersistenceResult<T> = Result<T, WorkflowPersistenceError>;

/// Acknowledgement of a stored checklist submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistReceipt {
    /// Submission record identifier.
    pub id: Uuid,
    /// When the submission was stored.
    pub recorded_at: DateTime<Utc>,
}

/// Object storage key of an uploaded photo.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceKey(String);

impl EvidenceKey {
    /// Wraps an object storage key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Acknowledgement of a stored signature record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureReceipt {
    /// `signatures` record identifier.
    pub id: Uuid,
    /// When the record was stored.
    pub recorded_at: DateTime<Utc>,
}

/// Checklist submission interface.
#[async_trait]
pub trait ChecklistRecorder: Send + Sync {
    /// Stores validated checklist answers for a task.
    async fn submit(
        &self,
        task_id: TaskId,
        checklist: &ValidatedChecklist,
        actor: ActorId,
    ) -> WorkflowPersistenceResult<ChecklistReceipt>;
}

/// Completion evidence interface backed by object storage.
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Uploads one photo and returns its object key.
    async fn store_photo(
        &self,
        task_id: TaskId,
        photo: &PhotoCapture,
    ) -> WorkflowPersistenceResult<EvidenceKey>;

    /// Stores the signature image and the `signatures` record referencing
    /// the uploaded photos.
    async fn store_signature(
        &self,
        task_id: TaskId,
        signature: &SignatureCapture,
        photos: &[EvidenceKey],
        actor: ActorId,
    ) -> WorkflowPersistenceResult<SignatureReceipt>;

    /// Returns whether evidence was captured for the task by a prior attempt.
    async fn has_evidence(&self, task_id: TaskId) -> WorkflowPersistenceResult<bool>;
}

/// Errors returned by workflow persistence adapters.
#[derive(Debug, Clone, Error)]
pub enum WorkflowPersistenceError {
    /// The backend rejected the payload.
    #[error("workflow payload rejected: {0}")]
    Rejected(String),

    /// Storage failure.
    #[error("workflow storage error: {0}")]
    Storage(Arc<dyn std::error::Error + Send + Sync>),
}

impl WorkflowPersistenceError {
    /// Wraps a storage error.
    pub fn storage(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Storage(Arc::new(err))
    }
}
