//! Tests for audit-trail rendering and actor inference.

use std::sync::Arc;

use crate::task::{
    adapters::memory::{InMemoryChangeEventBus, InMemoryTaskStore, StaticActorDirectory},
    domain::{ActorId, AuditAction, NewTask, TaskId, TaskKind, TaskPatch, TaskPriority, TaskStatus},
    ports::{StatusExtras, TaskStore},
    services::TaskHistoryService,
};
use rstest::{fixture, rstest};

struct HistoryHarness {
    store: Arc<InMemoryTaskStore>,
    service: TaskHistoryService<InMemoryTaskStore, StaticActorDirectory>,
    ana: ActorId,
    bruno: ActorId,
}

#[fixture]
fn harness() -> HistoryHarness {
    let ana = ActorId::new();
    let bruno = ActorId::new();
    let store = Arc::new(InMemoryTaskStore::new(InMemoryChangeEventBus::new()));
    let directory = StaticActorDirectory::new()
        .with_actor(ana, "Ana")
        .with_actor(bruno, "Bruno");
    let service = TaskHistoryService::new(Arc::clone(&store), Arc::new(directory));
    HistoryHarness {
        store,
        service,
        ana,
        bruno,
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn history_renders_each_write_with_its_actor(harness: HistoryHarness) {
    let task = harness
        .store
        .create_task(NewTask::new(TaskKind::Delivery), None, &[], harness.ana)
        .await
        .expect("create should succeed");
    harness
        .store
        .update_task(
            task.id(),
            &TaskPatch::new().with_priority(TaskPriority::High),
            harness.bruno,
        )
        .await
        .expect("update should succeed");

    let history = harness
        .service
        .history(task.id())
        .await
        .expect("history should load");

    assert_eq!(history.len(), 2);
    let created = history.first().expect("creation entry");
    assert_eq!(created.action, AuditAction::Created);
    assert_eq!(created.actor_name.as_deref(), Some("Ana"));
    assert!(created.changes.contains(&"status: ∅ → pending".to_owned()));

    let updated = history.last().expect("update entry");
    assert_eq!(updated.action, AuditAction::Updated);
    assert_eq!(updated.actor_name.as_deref(), Some("Bruno"));
    assert_eq!(updated.changes, vec!["priority: medium → high".to_owned()]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn latest_actor_follows_the_last_write(harness: HistoryHarness) {
    let task = harness
        .store
        .create_task(NewTask::new(TaskKind::Test), None, &[], harness.ana)
        .await
        .expect("create should succeed");
    harness
        .store
        .update_task_status(
            task.id(),
            TaskStatus::InProgress,
            harness.bruno,
            &StatusExtras::new(),
        )
        .await
        .expect("status change should succeed");

    let latest = harness
        .service
        .latest_actor(task.id())
        .await
        .expect("audit trail should load");

    assert_eq!(latest, Some(harness.bruno));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn explicit_actor_wins_over_the_audit_trail(harness: HistoryHarness) {
    let task = harness
        .store
        .create_task(NewTask::new(TaskKind::Pickup), None, &[], harness.bruno)
        .await
        .expect("create should succeed");

    let name = harness
        .service
        .resolve_actor_name(Some(harness.ana), task.id())
        .await;

    assert_eq!(name.as_deref(), Some("Ana"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_actor_is_inferred_from_the_audit_trail(harness: HistoryHarness) {
    let task = harness
        .store
        .create_task(NewTask::new(TaskKind::Rescue), None, &[], harness.bruno)
        .await
        .expect("create should succeed");

    let name = harness.service.resolve_actor_name(None, task.id()).await;

    assert_eq!(name.as_deref(), Some("Bruno"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_actors_resolve_to_none(harness: HistoryHarness) {
    let stranger = harness
        .service
        .resolve_actor_name(Some(ActorId::new()), TaskId::new())
        .await;
    let untraced = harness.service.resolve_actor_name(None, TaskId::new()).await;

    assert_eq!(stranger, None);
    assert_eq!(untraced, None);
}
