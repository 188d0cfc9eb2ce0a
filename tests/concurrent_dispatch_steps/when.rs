//! When steps for concurrent dispatch BDD scenarios.

use super::world::ConcurrentWorld;
use crate::support::run_async;
use chrono::TimeDelta;
use eyre::WrapErr;
use rstest_bdd_macros::when;
use waypoint::task::domain::{TaskPatch, TaskPriority};

#[when(r#""{name}" sets the priority to "{priority}""#)]
fn set_priority(
    world: &mut ConcurrentWorld,
    name: String,
    priority: String,
) -> Result<(), eyre::Report> {
    let parsed = TaskPriority::try_from(priority.as_str())
        .map_err(|err| eyre::eyre!("invalid priority in scenario: {err}"))?;
    let task_id = world.task_id()?;
    let patch = TaskPatch::new().with_priority(parsed);
    run_async(world.client(&name)?.edit_fields(task_id, &patch))
        .wrap_err_with(|| format!("{name} edits the priority"))?;
    Ok(())
}

#[when(r#""{name}" changes the details to "{details}""#)]
fn change_details(
    world: &mut ConcurrentWorld,
    name: String,
    details: String,
) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let patch = TaskPatch::new().with_details(details);
    run_async(world.client(&name)?.edit_fields(task_id, &patch))
        .wrap_err_with(|| format!("{name} edits the details"))?;
    Ok(())
}

#[when("{seconds:i64} seconds pass")]
fn seconds_pass(world: &mut ConcurrentWorld, seconds: i64) {
    world.dispatch.clock.advance(TimeDelta::seconds(seconds));
}
