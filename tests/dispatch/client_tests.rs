//! Tests for gestures routed through connected dispatch clients.

use crate::support::{Client, Dispatch, eventually};
use eyre::{OptionExt, bail, ensure};
use rstest::{fixture, rstest};
use waypoint::sync::{
    domain::{NoticeKey, SyncError},
    services::{BulkAction, MutationOutcome, TransitionOutcome},
};
use waypoint::task::{
    domain::{DriverId, NewTask, TaskId, TaskKind, TaskPatch, TaskStatus},
    ports::{NotificationEventType, StatusExtras, TaskStore},
};
use waypoint::workflow::domain::{
    CompletionFormDraft, PhotoCapture, SignatureCapture, WorkflowDomainError, WorkflowSubmission,
};

#[fixture]
fn dispatch() -> Dispatch {
    Dispatch::new()
}

async fn pair(dispatch: &mut Dispatch) -> eyre::Result<(Client, Client)> {
    let ana = dispatch.dispatcher("Ana");
    let bruno = dispatch.dispatcher("Bruno");
    Ok((dispatch.connect(ana).await?, dispatch.connect(bruno).await?))
}

async fn lead_visible(client: &Client, task_id: TaskId, lead: DriverId) -> eyre::Result<()> {
    eventually("the lead row to arrive", || {
        Ok(client.read(|board| board.lead_for(task_id) == Some(lead))?)
    })
    .await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn connecting_loads_the_current_board(mut dispatch: Dispatch) -> eyre::Result<()> {
    let writer = dispatch.dispatcher("Carla");
    let lead = DriverId::new();
    let existing = dispatch
        .store
        .create_task(NewTask::new(TaskKind::Transfer), Some(lead), &[], writer)
        .await?;
    let gone = dispatch
        .store
        .create_task(NewTask::new(TaskKind::Other), None, &[], writer)
        .await?;
    dispatch.store.soft_delete_task(gone.id(), writer).await?;

    let reader = dispatch.dispatcher("Ana");
    let client = dispatch.connect(reader).await?;

    let (count, shown_lead) =
        client.read(|board| (board.len(), board.lead_for(existing.id())))?;
    ensure!(count == 1);
    ensure!(shown_lead == Some(lead));
    ensure!(client.task(gone.id())?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn edits_reach_other_dispatchers_and_notify_assignees(
    mut dispatch: Dispatch,
) -> eyre::Result<()> {
    let (ana, bruno) = pair(&mut dispatch).await?;
    let lead = DriverId::new();
    let helper = DriverId::new();

    let task = ana
        .create_task(NewTask::new(TaskKind::Delivery), Some(lead), &[helper])
        .await?;
    eventually("both assignment rows on the first board", || {
        Ok(ana.read(|board| board.assignees_for(task.id()).len())? == 2)
    })
    .await?;
    lead_visible(&bruno, task.id(), lead).await?;

    let outcome = ana
        .edit_fields(task.id(), &TaskPatch::new().with_details("Leave at reception"))
        .await?;

    ensure!(outcome == MutationOutcome::Committed);
    eventually("the edit to reach the second board", || {
        Ok(bruno
            .task(task.id())?
            .is_some_and(|shown| shown.details() == "Leave at reception"))
    })
    .await?;

    let intents = dispatch.notifier.intents();
    let created = intents
        .iter()
        .find(|intent| intent.event_type == NotificationEventType::TaskAssigned)
        .ok_or_eyre("assignment intent")?;
    ensure!(created.recipients == vec![lead, helper]);
    let updated = intents
        .iter()
        .find(|intent| intent.event_type == NotificationEventType::TaskUpdated)
        .ok_or_eyre("update intent")?;
    ensure!(updated.recipients.len() == 2);
    ensure!(updated.recipients.contains(&lead) && updated.recipients.contains(&helper));
    ensure!(updated.payload.get("fields") == Some(&serde_json::json!(["details"])));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reassignment_notifies_both_leads(mut dispatch: Dispatch) -> eyre::Result<()> {
    let (ana, bruno) = pair(&mut dispatch).await?;
    let before = DriverId::new();
    let after = DriverId::new();
    let task = ana
        .create_task(NewTask::new(TaskKind::Pickup), Some(before), &[])
        .await?;
    lead_visible(&ana, task.id(), before).await?;

    ana.reassign(task.id(), after).await?;

    lead_visible(&bruno, task.id(), after).await?;
    let reassigned = dispatch
        .notifier
        .intents()
        .into_iter()
        .find(|intent| intent.event_type == NotificationEventType::TaskReassigned)
        .ok_or_eyre("reassignment intent")?;
    ensure!(reassigned.recipients == vec![after, before]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_write_is_undone_without_notifying(mut dispatch: Dispatch) -> eyre::Result<()> {
    let (ana, _bruno) = pair(&mut dispatch).await?;
    let lead = DriverId::new();
    let task = ana
        .create_task(NewTask::new(TaskKind::Pickup), Some(lead), &[])
        .await?;
    lead_visible(&ana, task.id(), lead).await?;
    dispatch.store.fail_writes_to(task.id())?;

    let result = ana.reassign(task.id(), DriverId::new()).await;

    ensure!(matches!(result, Err(SyncError::WriteFailed { .. })));
    ensure!(ana.read(|board| board.lead_for(task.id()))? == Some(lead));
    let notices = ana.drain_notices()?;
    ensure!(notices.iter().any(|notice| notice.key == NoticeKey::WriteFailed));
    ensure!(
        !dispatch
            .notifier
            .intents()
            .iter()
            .any(|intent| intent.event_type == NotificationEventType::TaskReassigned)
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rejected_creation_reports_a_notice(mut dispatch: Dispatch) -> eyre::Result<()> {
    let ana = dispatch.dispatcher("Ana");
    let client = dispatch.connect(ana).await?;
    let driver = DriverId::new();

    let result = client
        .create_task(NewTask::new(TaskKind::Test), Some(driver), &[driver])
        .await;

    ensure!(matches!(result, Err(SyncError::Store(_))));
    ensure!(client.read(|board| board.is_empty())?);
    let notices = client.drain_notices()?;
    ensure!(notices.first().map(|notice| notice.key) == Some(NoticeKey::WriteFailed));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn bulk_delete_of_the_selection_reaches_every_board(
    mut dispatch: Dispatch,
) -> eyre::Result<()> {
    let (ana, bruno) = pair(&mut dispatch).await?;
    let first = ana.create_task(NewTask::new(TaskKind::Other), None, &[]).await?;
    let second = ana.create_task(NewTask::new(TaskKind::Other), None, &[]).await?;
    eventually("both tasks on the second board", || {
        Ok(bruno.read(|board| board.len())? == 2)
    })
    .await?;
    ana.select(first.id())?;
    ana.select(second.id())?;

    let report = ana.bulk(BulkAction::Delete).await?;

    ensure!(report.written.len() == 2);
    ensure!(ana.read(|board| board.is_empty() && board.selection().is_empty())?);
    eventually("the deletes to reach the second board", || {
        Ok(bruno.read(|board| board.is_empty())?)
    })
    .await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn forced_completion_form_stores_evidence_before_completing(
    mut dispatch: Dispatch,
) -> eyre::Result<()> {
    let ana = dispatch.dispatcher("Ana");
    let task = dispatch
        .store
        .create_task(NewTask::new(TaskKind::Pickup), Some(DriverId::new()), &[], ana)
        .await?;
    dispatch
        .store
        .update_task_status(task.id(), TaskStatus::InProgress, ana, &StatusExtras::new())
        .await?;
    let client = dispatch.connect(ana).await?;

    let TransitionOutcome::WorkflowOpened(session) =
        client.request_status(task.id(), TaskStatus::Completed).await?
    else {
        bail!("completing a pickup should open the completion form");
    };
    ensure!(matches!(
        client.cancel_workflow(session.id()),
        Err(SyncError::WorkflowInvalid(WorkflowDomainError::ForcedCompletion))
    ));

    let draft = CompletionFormDraft::default()
        .with_photo(PhotoCapture::jpeg("front.jpg", vec![0xFF, 0xD8, 0x01]))
        .with_photo(PhotoCapture::jpeg("rear.jpg", vec![0xFF, 0xD8, 0x02]))
        .with_signature(SignatureCapture {
            signer_name: "Dana Ruiz".to_owned(),
            image_png: vec![0x89, 0x50],
        });
    let outcome = client
        .submit_workflow(session.id(), WorkflowSubmission::CompletionForm(draft))
        .await?;

    ensure!(outcome == TransitionOutcome::Committed);
    ensure!(dispatch.recorder.photos_for(task.id()).len() == 2);
    ensure!(dispatch.recorder.signatures().len() == 1);
    let stored = dispatch.store.find_task(task.id()).await?;
    ensure!(stored.map(|t| t.status()) == Some(TaskStatus::Completed));
    ensure!(client.workflow_session(session.id())?.is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reconnecting_recovers_writes_missed_while_offline(
    mut dispatch: Dispatch,
) -> eyre::Result<()> {
    let ana = dispatch.dispatcher("Ana");
    let writer = dispatch.dispatcher("Bruno");
    let client = dispatch.connect(ana).await?;

    dispatch.bus.disconnect_all();
    let missed = dispatch
        .store
        .create_task(NewTask::new(TaskKind::Rescue), None, &[], writer)
        .await?;

    eventually("the missed task to appear", || {
        Ok(client.task(missed.id())?.is_some())
    })
    .await?;
    ensure!(dispatch.bus.subscribe_attempts() >= 4);
    Ok(())
}
