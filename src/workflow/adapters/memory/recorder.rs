//! In-memory checklist recorder and evidence store.

use async_trait::async_trait;
use mockable::{Clock, DefaultClock};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::task::domain::{ActorId, TaskId};
use crate::workflow::{
    domain::{PhotoCapture, SignatureCapture, ValidatedChecklist},
    ports::{
        ChecklistReceipt, ChecklistRecorder, EvidenceKey, EvidenceStore, SignatureReceipt,
        WorkflowPersistenceError, WorkflowPersistenceResult,
    },
};

/// Stored checklist submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedChecklist {
    /// Task the answers belong to.
    pub task_id: TaskId,
    /// Submitting actor.
    pub actor: ActorId,
    /// Stored answers.
    pub checklist: ValidatedChecklist,
    /// Acknowledgement returned to the caller.
    pub receipt: ChecklistReceipt,
}

/// Stored `signatures` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedSignature {
    /// Task the signature belongs to.
    pub task_id: TaskId,
    /// Name typed by the signer.
    pub signer_name: String,
    /// Photos referenced by the record.
    pub photos: Vec<EvidenceKey>,
    /// Acknowledgement returned to the caller.
    pub receipt: SignatureReceipt,
}

/// Workflow persistence backed by process memory.
#[derive(Clone)]
pub struct InMemoryWorkflowRecorder<C = DefaultClock>
where
    C: Clock + Send + Sync,
{
    state: Arc<RwLock<RecorderState>>,
    clock: Arc<C>,
}

#[derive(Debug, Default)]
struct RecorderState {
    checklists: Vec<RecordedChecklist>,
    photos: HashMap<TaskId, Vec<EvidenceKey>>,
    signatures: Vec<RecordedSignature>,
    rejecting: bool,
    rejecting_tasks: HashSet<TaskId>,
}

impl InMemoryWorkflowRecorder<DefaultClock> {
    /// Creates an empty recorder using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(DefaultClock))
    }
}

impl Default for InMemoryWorkflowRecorder<DefaultClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> InMemoryWorkflowRecorder<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an empty recorder using `clock` for receipts.
    #[must_use]
    pub fn with_clock(clock: Arc<C>) -> Self {
        Self {
            state: Arc::new(RwLock::new(RecorderState::default())),
            clock,
        }
    }

    /// Makes every subsequent write fail until [`Self::accept_writes`].
    pub fn reject_writes(&self) {
        if let Ok(mut state) = self.state.write() {
            state.rejecting = true;
        }
    }

    /// Makes writes for one task fail.
    pub fn reject_writes_for(&self, task_id: TaskId) {
        if let Ok(mut state) = self.state.write() {
            state.rejecting_tasks.insert(task_id);
        }
    }

    /// Clears injected failures.
    pub fn accept_writes(&self) {
        if let Ok(mut state) = self.state.write() {
            state.rejecting = false;
            state.rejecting_tasks.clear();
        }
    }

    /// Seeds evidence as if captured by an earlier attempt.
    pub fn seed_evidence(&self, task_id: TaskId, key: EvidenceKey) {
        if let Ok(mut state) = self.state.write() {
            state.photos.entry(task_id).or_default().push(key);
        }
    }

    /// Returns stored checklist submissions.
    #[must_use]
    pub fn checklists(&self) -> Vec<RecordedChecklist> {
        self.state
            .read()
            .map(|state| state.checklists.clone())
            .unwrap_or_default()
    }

    /// Returns stored signature records.
    #[must_use]
    pub fn signatures(&self) -> Vec<RecordedSignature> {
        self.state
            .read()
            .map(|state| state.signatures.clone())
            .unwrap_or_default()
    }

    /// Returns the photo keys stored for a task.
    #[must_use]
    pub fn photos_for(&self, task_id: TaskId) -> Vec<EvidenceKey> {
        self.state
            .read()
            .map(|state| state.photos.get(&task_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn write_state(
        &self,
        task_id: TaskId,
    ) -> WorkflowPersistenceResult<std::sync::RwLockWriteGuard<'_, RecorderState>> {
        let state = self
            .state
            .write()
            .map_err(|err| WorkflowPersistenceError::storage(std::io::Error::other(err.to_string())))?;
        if state.rejecting || state.rejecting_tasks.contains(&task_id) {
            return Err(WorkflowPersistenceError::storage(std::io::Error::other(
                "workflow storage unavailable",
            )));
        }
        Ok(state)
    }
}

#[async_trait]
impl<C> ChecklistRecorder for InMemoryWorkflowRecorder<C>
where
    C: Clock + Send + Sync,
{
    async fn submit(
        &self,
        task_id: TaskId,
        checklist: &ValidatedChecklist,
        actor: ActorId,
    ) -> WorkflowPersistenceResult<ChecklistReceipt> {
        let mut state = self.write_state(task_id)?;
        let receipt = ChecklistReceipt {
            id: Uuid::new_v4(),
            recorded_at: self.clock.utc(),
        };
        state.checklists.push(RecordedChecklist {
            task_id,
            actor,
            checklist: checklist.clone(),
            receipt,
        });
        Ok(receipt)
    }
}

#[async_trait]
impl<C> EvidenceStore for InMemoryWorkflowRecorder<C>
where
    C: Clock + Send + Sync,
{
    async fn store_photo(
        &self,
        task_id: TaskId,
        photo: &PhotoCapture,
    ) -> WorkflowPersistenceResult<EvidenceKey> {
        if photo.bytes.is_empty() {
            return Err(WorkflowPersistenceError::Rejected(format!(
                "photo '{}' has no content",
                photo.file_name
            )));
        }
        let mut state = self.write_state(task_id)?;
        let key = EvidenceKey::new(format!("tasks/{task_id}/{}-{}", Uuid::new_v4(), photo.file_name));
        state.photos.entry(task_id).or_default().push(key.clone());
        Ok(key)
    }

    async fn store_signature(
        &self,
        task_id: TaskId,
        signature: &SignatureCapture,
        photos: &[EvidenceKey],
        _actor: ActorId,
    ) -> WorkflowPersistenceResult<SignatureReceipt> {
        let mut state = self.write_state(task_id)?;
        let receipt = SignatureReceipt {
            id: Uuid::new_v4(),
            recorded_at: self.clock.utc(),
        };
        state.signatures.push(RecordedSignature {
            task_id,
            signer_name: signature.signer_name.clone(),
            photos: photos.to_vec(),
            receipt,
        });
        Ok(receipt)
    }

    async fn has_evidence(&self, task_id: TaskId) -> WorkflowPersistenceResult<bool> {
        let state = self
            .state
            .read()
            .map_err(|err| WorkflowPersistenceError::storage(std::io::Error::other(err.to_string())))?;
        Ok(state
            .photos
            .get(&task_id)
            .is_some_and(|photos| !photos.is_empty()))
    }
}
