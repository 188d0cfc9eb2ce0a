//! Shared world state for concurrent dispatch BDD scenarios.

use std::collections::HashMap;

use crate::support::{Client, Dispatch};
use rstest::fixture;
use waypoint::task::domain::TaskId;

/// Scenario world holding one client per dispatcher.
pub struct ConcurrentWorld {
    pub dispatch: Dispatch,
    pub clients: HashMap<String, Client>,
    pub task_id: Option<TaskId>,
}

impl ConcurrentWorld {
    /// Returns the client of the named dispatcher.
    pub fn client(&self, name: &str) -> eyre::Result<&Client> {
        self.clients
            .get(name)
            .ok_or_else(|| eyre::eyre!("dispatcher {name} is not connected"))
    }

    /// Returns the shared task.
    pub fn task_id(&self) -> eyre::Result<TaskId> {
        self.task_id
            .ok_or_else(|| eyre::eyre!("missing shared task in scenario world"))
    }
}

impl Default for ConcurrentWorld {
    fn default() -> Self {
        Self {
            dispatch: Dispatch::new(),
            clients: HashMap::new(),
            task_id: None,
        }
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> ConcurrentWorld {
    ConcurrentWorld::default()
}
