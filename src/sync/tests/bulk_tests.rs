//! Tests for bulk operations.

use super::fixtures::{Harness, harness};
use crate::sync::{
    domain::{MutationLane, NoticeKey, SyncError},
    services::BulkAction,
};
use crate::task::{
    domain::{DriverId, TaskKind, TaskPriority},
    ports::TaskStore,
};
use eyre::{bail, ensure};
use rstest::rstest;

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn one_failure_rolls_back_the_whole_batch(harness: Harness) -> eyre::Result<()> {
    let first = harness.seed(TaskKind::Delivery, None).await;
    let second = harness.seed(TaskKind::Delivery, None).await;
    let third = harness.seed(TaskKind::Delivery, None).await;
    harness.store.fail_writes_to(second.id())?;
    let bulk = harness.bulk();

    let result = bulk
        .run(
            &[first.id(), second.id(), third.id()],
            BulkAction::ChangePriority(TaskPriority::High),
        )
        .await;

    match result {
        Err(SyncError::PartialBulkFailure {
            failed,
            total,
            restored,
            failures,
        }) => {
            ensure!(failed == 1 && total == 3 && restored == 3);
            ensure!(failures.first().map(|(id, _)| *id) == Some(second.id()));
        }
        other => bail!("expected a partial bulk failure, got {other:?}"),
    }
    for task in [&first, &second, &third] {
        let shown = harness.board_task(task.id());
        ensure!(shown.map(|t| t.priority()) == Some(TaskPriority::Medium));
        ensure!(!harness.board.read(|b| b.is_busy(task.id(), MutationLane::Fields))?);
    }
    ensure!(harness.notice_keys() == vec![NoticeKey::BulkFailed]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn successful_batch_reports_written_and_skipped(harness: Harness) -> eyre::Result<()> {
    let driver = DriverId::new();
    let already_led = harness.seed(TaskKind::Pickup, Some(driver)).await;
    let unassigned = harness.seed(TaskKind::Pickup, None).await;
    let bulk = harness.bulk();

    let report = bulk
        .run(
            &[already_led.id(), unassigned.id(), unassigned.id()],
            BulkAction::Reassign(driver),
        )
        .await?;

    ensure!(report.written == vec![unassigned.id()]);
    ensure!(report.skipped == vec![already_led.id()]);
    ensure!(harness.lead(unassigned.id()) == Some(driver));
    let stored_rows = harness.store.list_assignees().await?;
    ensure!(
        stored_rows
            .iter()
            .any(|row| row.task_id == unassigned.id() && row.is_lead && row.driver_id == driver)
    );
    ensure!(harness.notice_keys() == vec![NoticeKey::BulkSucceeded]);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn bulk_delete_clears_the_selection(harness: Harness) -> eyre::Result<()> {
    let first = harness.seed(TaskKind::Other, None).await;
    let second = harness.seed(TaskKind::Other, None).await;
    harness.board.write(|board| {
        board.select(first.id());
        board.select(second.id());
    })?;
    let selection: Vec<_> = harness
        .board
        .read(|board| board.selection().iter().copied().collect())?;
    let bulk = harness.bulk();

    let report = bulk.run(&selection, BulkAction::Delete).await?;

    ensure!(report.written.len() == 2);
    ensure!(harness.board.read(|b| b.is_empty() && b.selection().is_empty())?);
    ensure!(harness.store.list_tasks().await?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn other_bulk_actions_keep_the_selection(harness: Harness) -> eyre::Result<()> {
    let task = harness.seed(TaskKind::Other, None).await;
    harness.board.write(|board| board.select(task.id()))?;
    let bulk = harness.bulk();

    bulk.run(&[task.id()], BulkAction::ChangePriority(TaskPriority::Low))
        .await?;

    ensure!(harness.board.read(|b| b.selection().contains(&task.id()))?);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn empty_selection_is_rejected(harness: Harness) -> eyre::Result<()> {
    let bulk = harness.bulk();

    let result = bulk.run(&[], BulkAction::Delete).await;

    ensure!(matches!(result, Err(SyncError::EmptySelection)));
    ensure!(harness.store.calls()?.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn busy_member_blocks_the_batch_before_any_change(harness: Harness) -> eyre::Result<()> {
    let idle = harness.seed(TaskKind::Other, None).await;
    let busy = harness.seed(TaskKind::Other, None).await;
    harness
        .board
        .write(|board| board.begin(busy.id(), MutationLane::Deletion))??;
    let calls_before = harness.store.calls()?.len();
    let bulk = harness.bulk();

    let result = bulk.run(&[idle.id(), busy.id()], BulkAction::Delete).await;

    ensure!(matches!(result, Err(SyncError::Busy { task_id, .. }) if task_id == busy.id()));
    ensure!(harness.board_task(idle.id()).is_some());
    ensure!(!harness.board.read(|b| b.is_busy(idle.id(), MutationLane::Deletion))?);
    ensure!(harness.store.calls()?.len() == calls_before);
    Ok(())
}
