//! In-memory workflow persistence adapters.

mod recorder;

pub use recorder::{InMemoryWorkflowRecorder, RecordedChecklist, RecordedSignature};
