//! Domain model for dispatch tasks.
//!
//! Tasks, their ordered stops, driver assignments and the audit trail are the
//! records the task store holds as server truth. Clients mirror them locally
//! and mutate their mirror optimistically; nothing in this module performs
//! I/O.

mod assignee;
mod audit;
mod error;
mod ids;
mod patch;
mod stop;
mod task;

pub use assignee::{AssigneeRoster, TaskAssignee};
pub use audit::{AuditAction, AuditEntry, AuditRecord};
pub use error::{ParseTaskKindError, ParseTaskPriorityError, ParseTaskStatusError, TaskDomainError};
pub use ids::{ActorId, AssignmentId, ClientAccountId, DriverId, TaskId, VehicleId};
pub use patch::TaskPatch;
pub use stop::{Stop, StopContact};
pub use task::{NewTask, PersistedTaskData, Schedule, Task, TaskKind, TaskPriority, TaskStatus};
