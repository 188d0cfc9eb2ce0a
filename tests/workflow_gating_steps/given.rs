//! Given steps for workflow gating BDD scenarios.

use super::world::GatingWorld;
use crate::support::{eventually, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use waypoint::task::{
    domain::{NewTask, TaskKind, TaskStatus},
    ports::{StatusExtras, TaskStore},
};

#[given("a dispatcher watching the board")]
fn dispatcher_watching(world: &mut GatingWorld) -> Result<(), eyre::Report> {
    let actor = world.dispatch.dispatcher("Ana");
    let client = run_async(world.dispatch.connect(actor))?;
    world.client = Some(client);
    Ok(())
}

#[given(r#"a pending "{kind}" task"#)]
fn pending_task(world: &mut GatingWorld, kind: String) -> Result<(), eyre::Report> {
    let parsed = TaskKind::try_from(kind.as_str())
        .map_err(|err| eyre::eyre!("invalid task kind in scenario: {err}"))?;
    let created = run_async(world.client()?.create_task(NewTask::new(parsed), None, &[]))
        .wrap_err("create task for gating scenario")?;
    world.task = Some(created);
    Ok(())
}

#[given(r#"an in progress "{kind}" task"#)]
fn in_progress_task(world: &mut GatingWorld, kind: String) -> Result<(), eyre::Report> {
    let parsed = TaskKind::try_from(kind.as_str())
        .map_err(|err| eyre::eyre!("invalid task kind in scenario: {err}"))?;
    let driver = world.dispatch.dispatcher("Field driver");
    let store = &world.dispatch.store;
    let created = run_async(store.create_task(NewTask::new(parsed), None, &[], driver))
        .wrap_err("create task for gating scenario")?;
    run_async(store.update_task_status(
        created.id(),
        TaskStatus::InProgress,
        driver,
        &StatusExtras::new(),
    ))
    .wrap_err("start task for gating scenario")?;
    let client = world.client()?;
    run_async(eventually("the started task on the board", || {
        Ok(client
            .task(created.id())?
            .is_some_and(|task| task.status() == TaskStatus::InProgress))
    }))?;
    world.task = Some(created);
    Ok(())
}
