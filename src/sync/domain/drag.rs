//! Drag-and-drop column moves on the dispatch board.

use super::MutationKind;
use crate::task::domain::{DriverId, TaskStatus};

/// How the board groups task cards into columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardGrouping {
    /// One column per status.
    Status,
    /// One column per lead driver.
    Driver,
}

/// Column a card was dropped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropTarget {
    /// Status column.
    StatusColumn(TaskStatus),
    /// Driver column.
    DriverColumn(DriverId),
}

impl DropTarget {
    /// Returns the grouping the target belongs to.
    #[must_use]
    pub const fn grouping(self) -> BoardGrouping {
        match self {
            Self::StatusColumn(_) => BoardGrouping::Status,
            Self::DriverColumn(_) => BoardGrouping::Driver,
        }
    }

    /// Resolves a drop into the mutation it implies.
    ///
    /// Returns `None` when the card already sits in the target column.
    #[must_use]
    pub fn resolve(
        self,
        current_status: TaskStatus,
        current_lead: Option<DriverId>,
    ) -> Option<MutationKind> {
        match self {
            Self::StatusColumn(status) if status == current_status => None,
            Self::StatusColumn(status) => Some(MutationKind::status(status)),
            Self::DriverColumn(driver) if current_lead == Some(driver) => None,
            Self::DriverColumn(driver) => Some(MutationKind::ReassignLead(driver)),
        }
    }
}
