//! Application services over the task store.

mod history;

pub use history::{HistoryEntry, TaskHistoryError, TaskHistoryResult, TaskHistoryService};
