//! Tests for inbound event reconciliation and conflict detection.

use std::time::Duration;

use super::fixtures::{Harness, harness};
use crate::sync::{
    domain::{Mutation, MutationKind, NoticeKey},
    services::InboxMessage,
};
use crate::task::{
    adapters::memory::StaticActorDirectory,
    domain::{ActorId, DriverId, NewTask, TaskId, TaskKind, TaskPatch, TaskPriority},
    ports::{ChangeEvent, ChangeEventBus, ChangeSubscription, Collection, TaskStore},
};
use chrono::TimeDelta;
use eyre::{OptionExt, ensure};
use mockable::Clock;
use rstest::rstest;

async fn next_event(subscription: &mut ChangeSubscription) -> eyre::Result<ChangeEvent> {
    tokio::time::timeout(Duration::from_secs(1), subscription.next())
        .await?
        .ok_or_eyre("subscription closed")
}

struct Remote {
    actor: ActorId,
    directory: StaticActorDirectory,
}

fn remote() -> Remote {
    let actor = ActorId::new();
    Remote {
        actor,
        directory: StaticActorDirectory::new().with_actor(actor, "Bruno"),
    }
}

async fn edit_locally(harness: &Harness, task_id: TaskId) -> eyre::Result<()> {
    harness
        .pipeline()
        .run(Mutation::new(task_id, MutationKind::priority(TaskPriority::High)))
        .await?;
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn remote_write_after_a_local_edit_raises_one_conflict(harness: Harness) -> eyre::Result<()> {
    let task = harness.seed(TaskKind::Delivery, None).await;
    let other = remote();
    let reconciler = harness.reconciler(other.directory.clone());
    let mut tasks = harness.bus.subscribe(Collection::Tasks).await?;

    edit_locally(&harness, task.id()).await?;
    harness.clock.advance(TimeDelta::seconds(2));
    harness
        .store
        .update_task(task.id(), &TaskPatch::new().with_details("gate code 4411"), other.actor)
        .await?;
    reconciler.apply_event(next_event(&mut tasks).await?).await?;
    reconciler.apply_event(next_event(&mut tasks).await?).await?;

    let now = harness.clock.utc();
    let conflicts = harness.board.read(|board| board.conflicts(now))?;
    ensure!(conflicts.len() == 1);
    let indicator = conflicts.first().ok_or_eyre("indicator")?;
    ensure!(indicator.task_id == task.id());
    ensure!(indicator.actor_name.as_deref() == Some("Bruno"));
    ensure!(indicator.expires_at == now + TimeDelta::seconds(10));
    ensure!(harness.notice_keys() == vec![NoticeKey::Conflict]);

    let shown = harness.board_task(task.id()).ok_or_eyre("task on board")?;
    ensure!(shown.details() == "gate code 4411");
    ensure!(shown.revision() == 3);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn conflict_indicator_clears_after_ten_seconds(harness: Harness) -> eyre::Result<()> {
    let task = harness.seed(TaskKind::Other, None).await;
    let other = remote();
    let reconciler = harness.reconciler(other.directory.clone());
    let mut tasks = harness.bus.subscribe(Collection::Tasks).await?;
    edit_locally(&harness, task.id()).await?;
    harness
        .store
        .update_task(task.id(), &TaskPatch::new().with_details("late"), other.actor)
        .await?;
    reconciler.apply_event(next_event(&mut tasks).await?).await?;
    reconciler.apply_event(next_event(&mut tasks).await?).await?;

    harness.clock.advance(TimeDelta::milliseconds(9_999));
    ensure!(
        harness
            .board
            .read(|board| board.conflict(task.id(), harness.clock.utc()).is_some())?
    );

    harness.clock.advance(TimeDelta::milliseconds(1));
    ensure!(
        harness
            .board
            .read(|board| board.conflict(task.id(), harness.clock.utc()).is_none())?
    );
    ensure!(reconciler.prune()? == 1);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn own_writes_never_conflict(harness: Harness) -> eyre::Result<()> {
    let task = harness.seed(TaskKind::Other, None).await;
    let reconciler = harness.reconciler(StaticActorDirectory::new());
    let mut tasks = harness.bus.subscribe(Collection::Tasks).await?;

    edit_locally(&harness, task.id()).await?;
    reconciler.apply_event(next_event(&mut tasks).await?).await?;

    let now = harness.clock.utc();
    ensure!(harness.board.read(|board| board.conflicts(now).is_empty())?);
    ensure!(harness.notice_keys().is_empty());
    ensure!(harness.board_task(task.id()).map(|t| t.revision()) == Some(2));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn same_dispatcher_on_another_device_is_not_a_conflict(
    harness: Harness,
) -> eyre::Result<()> {
    let task = harness.seed(TaskKind::Delivery, None).await;
    let reconciler = harness.reconciler(StaticActorDirectory::new());
    let mut tasks = harness.bus.subscribe(Collection::Tasks).await?;

    edit_locally(&harness, task.id()).await?;
    harness.clock.advance(TimeDelta::seconds(1));
    harness
        .store
        .update_task(task.id(), &TaskPatch::new().with_details("from the tablet"), harness.actor)
        .await?;
    reconciler.apply_event(next_event(&mut tasks).await?).await?;
    reconciler.apply_event(next_event(&mut tasks).await?).await?;

    let now = harness.clock.utc();
    ensure!(harness.board.read(|board| board.conflicts(now).is_empty())?);
    ensure!(harness.notice_keys().is_empty());
    let shown = harness.board_task(task.id()).ok_or_eyre("task on board")?;
    ensure!(shown.details() == "from the tablet");
    ensure!(shown.revision() == 3);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn remote_writes_outside_the_window_are_merged_silently(
    harness: Harness,
) -> eyre::Result<()> {
    let task = harness.seed(TaskKind::Other, None).await;
    let other = remote();
    let reconciler = harness.reconciler(other.directory.clone());
    let mut tasks = harness.bus.subscribe(Collection::Tasks).await?;
    edit_locally(&harness, task.id()).await?;
    reconciler.apply_event(next_event(&mut tasks).await?).await?;

    harness.clock.advance(TimeDelta::seconds(6));
    harness
        .store
        .update_task(task.id(), &TaskPatch::new().with_priority(TaskPriority::Low), other.actor)
        .await?;
    reconciler.apply_event(next_event(&mut tasks).await?).await?;

    let now = harness.clock.utc();
    ensure!(harness.board.read(|board| board.conflicts(now).is_empty())?);
    ensure!(harness.board_task(task.id()).map(|t| t.priority()) == Some(TaskPriority::Low));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn remote_lead_change_infers_the_actor_from_the_audit_trail(
    harness: Harness,
) -> eyre::Result<()> {
    let task = harness.seed(TaskKind::Pickup, Some(DriverId::new())).await;
    let other = remote();
    let reconciler = harness.reconciler(other.directory.clone());
    let mut rows = harness.bus.subscribe(Collection::TaskAssignees).await?;
    let mine = DriverId::new();
    let theirs = DriverId::new();

    harness
        .pipeline()
        .run(Mutation::new(task.id(), MutationKind::ReassignLead(mine)))
        .await?;
    for _ in 0..2 {
        reconciler.apply_event(next_event(&mut rows).await?).await?;
    }
    let now = harness.clock.utc();
    ensure!(harness.board.read(|board| board.conflicts(now).is_empty())?);

    harness.store.reassign_lead(task.id(), theirs, other.actor).await?;
    for _ in 0..2 {
        reconciler.apply_event(next_event(&mut rows).await?).await?;
    }

    ensure!(harness.lead(task.id()) == Some(theirs));
    let indicator = harness
        .board
        .read(|board| board.conflict(task.id(), now).cloned())?
        .ok_or_eyre("lead conflict raised")?;
    ensure!(indicator.actor_name.as_deref() == Some("Bruno"));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn remote_soft_delete_removes_the_card(harness: Harness) -> eyre::Result<()> {
    let task = harness.seed(TaskKind::Other, Some(DriverId::new())).await;
    let reconciler = harness.reconciler(StaticActorDirectory::new());
    let mut tasks = harness.bus.subscribe(Collection::Tasks).await?;

    harness.store.soft_delete_task(task.id(), ActorId::new()).await?;
    reconciler.apply_event(next_event(&mut tasks).await?).await?;

    ensure!(harness.board_task(task.id()).is_none());
    ensure!(harness.lead(task.id()).is_none());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn resync_recovers_writes_missed_while_disconnected(harness: Harness) -> eyre::Result<()> {
    let kept = harness.seed(TaskKind::Other, None).await;
    let removed = harness.seed(TaskKind::Other, None).await;
    let reconciler = harness.reconciler(StaticActorDirectory::new());
    let writer = ActorId::new();
    harness
        .store
        .update_task(kept.id(), &TaskPatch::new().with_priority(TaskPriority::High), writer)
        .await?;
    harness.store.soft_delete_task(removed.id(), writer).await?;
    harness
        .store
        .create_task(NewTask::new(TaskKind::Test), None, &[], writer)
        .await?;

    reconciler.handle(InboxMessage::Resync).await?;

    let (count, priority, has_removed) = harness.board.read(|board| {
        (
            board.len(),
            board.task(kept.id()).map(|t| t.priority()),
            board.task(removed.id()).is_some(),
        )
    })?;
    ensure!(count == 2);
    ensure!(priority == Some(TaskPriority::High));
    ensure!(!has_removed);
    Ok(())
}
