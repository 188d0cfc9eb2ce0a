//! Shared world state for workflow gating BDD scenarios.

use crate::support::{Client, Dispatch};
use rstest::fixture;
use waypoint::sync::{domain::SyncResult, services::TransitionOutcome};
use waypoint::task::domain::Task;
use waypoint::workflow::domain::WorkflowSession;

/// Scenario world for workflow gating behaviour tests.
pub struct GatingWorld {
    pub dispatch: Dispatch,
    pub client: Option<Client>,
    pub task: Option<Task>,
    pub session: Option<WorkflowSession>,
    pub last_result: Option<SyncResult<TransitionOutcome>>,
}

impl GatingWorld {
    /// Returns the connected client.
    pub fn client(&self) -> eyre::Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| eyre::eyre!("no dispatcher connected in scenario world"))
    }

    /// Returns the task under test.
    pub fn task(&self) -> eyre::Result<&Task> {
        self.task
            .as_ref()
            .ok_or_else(|| eyre::eyre!("missing task in scenario world"))
    }
}

impl Default for GatingWorld {
    fn default() -> Self {
        Self {
            dispatch: Dispatch::new(),
            client: None,
            task: None,
            session: None,
            last_result: None,
        }
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> GatingWorld {
    GatingWorld::default()
}
