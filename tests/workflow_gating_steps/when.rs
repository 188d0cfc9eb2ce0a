//! When steps for workflow gating BDD scenarios.

use super::world::GatingWorld;
use crate::support::run_async;
use rstest_bdd_macros::when;
use serde_json::Value;
use waypoint::sync::services::TransitionOutcome;
use waypoint::task::domain::TaskStatus;
use waypoint::workflow::domain::{ChecklistValues, WorkflowSubmission};

#[when(r#"the dispatcher moves the task to "{status}""#)]
fn move_task(world: &mut GatingWorld, status: String) -> Result<(), eyre::Report> {
    let target = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))?;
    let task_id = world.task()?.id();
    let result = run_async(world.client()?.request_status(task_id, target));
    if let Ok(TransitionOutcome::WorkflowOpened(session)) = &result {
        world.session = Some(session.clone());
    }
    world.last_result = Some(result);
    Ok(())
}

#[when(r#"the dispatcher ticks "{first}" and "{second}""#)]
fn tick_two(world: &mut GatingWorld, first: String, second: String) -> Result<(), eyre::Report> {
    submit_ticked(world, &[first, second])
}

#[when(r#"the dispatcher ticks only "{field}""#)]
fn tick_one(world: &mut GatingWorld, field: String) -> Result<(), eyre::Report> {
    submit_ticked(world, &[field])
}

fn submit_ticked(world: &mut GatingWorld, fields: &[String]) -> Result<(), eyre::Report> {
    let session_id = world
        .session
        .as_ref()
        .map(|session| session.id())
        .ok_or_else(|| eyre::eyre!("no workflow open in scenario world"))?;
    let values: ChecklistValues = fields
        .iter()
        .map(|field| (field.clone(), Value::Bool(true)))
        .collect();
    let result = run_async(
        world
            .client()?
            .submit_workflow(session_id, WorkflowSubmission::Checklist(values)),
    );
    world.last_result = Some(result);
    Ok(())
}
