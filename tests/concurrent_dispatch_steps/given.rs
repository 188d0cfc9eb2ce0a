//! Given steps for concurrent dispatch BDD scenarios.

use super::world::ConcurrentWorld;
use crate::support::{eventually, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use waypoint::task::{
    domain::{NewTask, TaskKind},
    ports::TaskStore,
};

#[given(r#"dispatchers "{first}" and "{second}" watching the board"#)]
fn dispatchers_watching(
    world: &mut ConcurrentWorld,
    first: String,
    second: String,
) -> Result<(), eyre::Report> {
    let actors: Vec<_> = [first, second]
        .into_iter()
        .map(|name| {
            let actor = world.dispatch.dispatcher(&name);
            (name, actor)
        })
        .collect();
    for (name, actor) in actors {
        let client = run_async(world.dispatch.connect(actor))
            .wrap_err_with(|| format!("connect {name}"))?;
        world.clients.insert(name, client);
    }
    Ok(())
}

#[given(r#"a "{kind}" task both boards show"#)]
fn shared_task(world: &mut ConcurrentWorld, kind: String) -> Result<(), eyre::Report> {
    let parsed = TaskKind::try_from(kind.as_str())
        .map_err(|err| eyre::eyre!("invalid task kind in scenario: {err}"))?;
    let office = world.dispatch.dispatcher("Back office");
    let task = run_async(
        world
            .dispatch
            .store
            .create_task(NewTask::new(parsed), None, &[], office),
    )
    .wrap_err("create shared task")?;
    let task_id = task.id();
    for client in world.clients.values() {
        run_async(eventually("the shared task on every board", || {
            Ok(client.task(task_id)?.is_some())
        }))?;
    }
    world.task_id = Some(task_id);
    Ok(())
}
