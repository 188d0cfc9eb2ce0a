//! Port abstractions for workflow payload persistence.

mod recorder;

pub use recorder::{
    ChecklistReceipt, ChecklistRecorder, EvidenceKey, EvidenceStore, SignatureReceipt,
    WorkflowPersistenceError, WorkflowPersistenceResult,
};
