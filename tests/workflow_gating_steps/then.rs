//! Then steps for workflow gating BDD scenarios.

use super::world::GatingWorld;
use crate::support::{eventually, run_async};
use rstest_bdd_macros::then;
use waypoint::sync::domain::{NoticeKey, SyncError};
use waypoint::task::{adapters::memory::StoreCall, domain::TaskStatus, ports::TaskStore};
use waypoint::workflow::domain::{WorkflowDomainError, WorkflowRequirement};

#[then(r#"the "{name}" checklist is shown"#)]
fn checklist_shown(world: &GatingWorld, name: String) -> Result<(), eyre::Report> {
    let session = world
        .session
        .as_ref()
        .ok_or_else(|| eyre::eyre!("expected a workflow, got {:?}", world.last_result))?;
    match session.requirement() {
        WorkflowRequirement::StartChecklist(schema)
        | WorkflowRequirement::CompletionChecklist(schema)
            if schema.name() == name =>
        {
            Ok(())
        }
        other => Err(eyre::eyre!("expected the {name} checklist, found {other:?}")),
    }
}

#[then(r#"the stored task is "{status}""#)]
fn stored_status(world: &GatingWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))?;
    let task_id = world.task()?.id();
    let stored = run_async(world.dispatch.store.find_task(task_id))?
        .ok_or_else(|| eyre::eyre!("task missing from the store"))?;
    if stored.status() != expected {
        return Err(eyre::eyre!(
            "expected status {}, found {}",
            expected.as_str(),
            stored.status().as_str()
        ));
    }
    Ok(())
}

#[then("the checklist submission is stored with the status change")]
fn checklist_stored(world: &GatingWorld) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let recorded = world.dispatch.recorder.checklists();
    if recorded.len() != 1 {
        return Err(eyre::eyre!("expected one checklist, found {}", recorded.len()));
    }
    let extras = world
        .dispatch
        .store
        .status_extras(task_id)?
        .ok_or_else(|| eyre::eyre!("status change carried no extras"))?;
    if !extras.contains_key("checklist_submission_id") {
        return Err(eyre::eyre!("status change does not reference the checklist"));
    }
    Ok(())
}

#[then(r#"the checklist is rejected for "{field}""#)]
fn checklist_rejected(world: &GatingWorld, field: String) -> Result<(), eyre::Report> {
    match &world.last_result {
        Some(Err(SyncError::WorkflowInvalid(WorkflowDomainError::MissingRequiredField {
            field: missing,
            ..
        }))) if *missing == field => Ok(()),
        other => Err(eyre::eyre!("expected {field} to be reported missing, got {other:?}")),
    }
}

#[then("the dispatcher is told the task must be in progress")]
fn told_in_progress(world: &GatingWorld) -> Result<(), eyre::Report> {
    if !matches!(world.last_result, Some(Err(SyncError::GuardedTransition { .. }))) {
        return Err(eyre::eyre!(
            "expected a guarded transition, got {:?}",
            world.last_result
        ));
    }
    let notices = world.client()?.drain_notices()?;
    if !notices
        .iter()
        .any(|notice| notice.key == NoticeKey::StatusRequiresInProgress)
    {
        return Err(eyre::eyre!("no in-progress notice among {notices:?}"));
    }
    Ok(())
}

#[then("exactly one completion request reached the store")]
fn one_completion_request(world: &GatingWorld) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let requests = world
        .dispatch
        .store
        .calls()?
        .into_iter()
        .filter(|call| {
            matches!(
                call,
                StoreCall::UpdateTaskStatus { task_id: id, next: TaskStatus::Completed }
                    if *id == task_id
            )
        })
        .count();
    if requests != 1 {
        return Err(eyre::eyre!("expected one completion request, found {requests}"));
    }
    Ok(())
}

#[then(r#"the board shows the task as "{status}""#)]
fn board_status(world: &GatingWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid status in scenario: {err}"))?;
    let task_id = world.task()?.id();
    let client = world.client()?;
    run_async(eventually("the board status", || {
        Ok(client
            .task(task_id)?
            .is_some_and(|task| task.status() == expected))
    }))
}
