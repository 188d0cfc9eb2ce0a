//! Then steps for concurrent dispatch BDD scenarios.

use super::world::ConcurrentWorld;
use crate::support::{eventually, run_async};
use mockable::Clock;
use rstest_bdd_macros::then;
use waypoint::task::domain::TaskPriority;

#[then(r#""{name}" sees a conflict indicator naming "{actor}""#)]
fn sees_conflict(world: &ConcurrentWorld, name: String, actor: String) -> Result<(), eyre::Report> {
    let client = world.client(&name)?;
    let task_id = world.task_id()?;
    let clock = &world.dispatch.clock;
    run_async(eventually("a conflict indicator", || {
        Ok(client.read(|board| {
            board
                .conflict(task_id, clock.utc())
                .is_some_and(|indicator| indicator.actor_name.as_deref() == Some(actor.as_str()))
        })?)
    }))
}

#[then(r#""{name}" sees the details "{details}""#)]
fn sees_details(world: &ConcurrentWorld, name: String, details: String) -> Result<(), eyre::Report> {
    let client = world.client(&name)?;
    let task_id = world.task_id()?;
    run_async(eventually("the remote details", || {
        Ok(client
            .task(task_id)?
            .is_some_and(|task| task.details() == details))
    }))
}

#[then(r#""{name}" sees the priority "{priority}""#)]
fn sees_priority(
    world: &ConcurrentWorld,
    name: String,
    priority: String,
) -> Result<(), eyre::Report> {
    let expected = TaskPriority::try_from(priority.as_str())
        .map_err(|err| eyre::eyre!("invalid priority in scenario: {err}"))?;
    let client = world.client(&name)?;
    let task_id = world.task_id()?;
    run_async(eventually("the converged priority", || {
        Ok(client
            .task(task_id)?
            .is_some_and(|task| task.priority() == expected))
    }))
}

#[then(r#""{name}" no longer sees a conflict indicator"#)]
fn no_conflict(world: &ConcurrentWorld, name: String) -> Result<(), eyre::Report> {
    let client = world.client(&name)?;
    let task_id = world.task_id()?;
    client.prune_expired()?;
    let now = world.dispatch.clock.utc();
    let shown = client.read(|board| board.conflict(task_id, now).is_some())?;
    if shown {
        return Err(eyre::eyre!("{name} still sees a conflict indicator"));
    }
    Ok(())
}
