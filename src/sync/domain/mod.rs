//! Client-side domain model: the board, optimistic mutations, conflict
//! indicators, notices and subscription freshness.

mod board;
mod conflict;
mod drag;
mod error;
mod freshness;
mod mutation;
mod notice;

pub use board::{BoardState, SharedBoard, Snapshot, TaskMerge};
pub use conflict::{ConflictBoard, ConflictIndicator};
pub use drag::{BoardGrouping, DropTarget};
pub use error::{SyncError, SyncResult};
pub use freshness::{Backoff, Freshness};
pub use mutation::{Mutation, MutationId, MutationKind, MutationLane};
pub use notice::{Notice, NoticeCatalog, NoticeKey, NoticeLevel};
