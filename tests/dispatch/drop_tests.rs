//! Tests for cards dropped on board columns.

use std::sync::Arc;

use async_trait::async_trait;
use eyre::ensure;
use mockable::DefaultClock;
use mockall::mock;
use rstest::rstest;
use waypoint::config::SyncConfig;
use waypoint::sync::{
    domain::DropTarget,
    services::{ClientPorts, DispatchClient, TransitionOutcome},
};
use waypoint::task::{
    adapters::memory::{InMemoryChangeEventBus, RecordingNotificationSink, StaticActorDirectory},
    domain::{
        ActorId, AuditRecord, DriverId, NewTask, Task, TaskAssignee, TaskId, TaskKind, TaskPatch,
        TaskStatus,
    },
    ports::{StatusExtras, TaskStore, TaskStoreResult},
};
use waypoint::workflow::adapters::memory::InMemoryWorkflowRecorder;

use crate::support::Dispatch;

mock! {
    pub Store {}

    #[async_trait]
    impl TaskStore for Store {
        async fn list_tasks(&self) -> TaskStoreResult<Vec<Task>>;
        async fn list_assignees(&self) -> TaskStoreResult<Vec<TaskAssignee>>;
        async fn find_task(&self, id: TaskId) -> TaskStoreResult<Option<Task>>;
        async fn audit_trail(&self, id: TaskId) -> TaskStoreResult<Vec<AuditRecord>>;
        async fn create_task(
            &self,
            draft: NewTask,
            lead: Option<DriverId>,
            co_drivers: &[DriverId],
            actor: ActorId,
        ) -> TaskStoreResult<Task>;
        async fn update_task(
            &self,
            id: TaskId,
            patch: &TaskPatch,
            actor: ActorId,
        ) -> TaskStoreResult<Task>;
        async fn update_task_status(
            &self,
            id: TaskId,
            next: TaskStatus,
            actor: ActorId,
            extras: &StatusExtras,
        ) -> TaskStoreResult<()>;
        async fn reassign_lead(
            &self,
            task_id: TaskId,
            driver_id: DriverId,
            actor: ActorId,
        ) -> TaskStoreResult<()>;
        async fn soft_delete_task(&self, id: TaskId, actor: ActorId) -> TaskStoreResult<()>;
    }
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dropping_a_card_on_its_own_column_writes_nothing() -> eyre::Result<()> {
    let writer = ActorId::new();
    let task = Task::create(TaskId::new(), NewTask::new(TaskKind::Delivery), writer, &DefaultClock);
    let lead = DriverId::new();
    let row = TaskAssignee::lead(task.id(), lead, task.created_at());

    let mut store = MockStore::new();
    let listed = task.clone();
    store
        .expect_list_tasks()
        .returning(move || Ok(vec![listed.clone()]));
    store
        .expect_list_assignees()
        .returning(move || Ok(vec![row.clone()]));
    store.expect_update_task_status().never();
    store.expect_reassign_lead().never();
    store.expect_update_task().never();

    let ports = ClientPorts {
        store: Arc::new(store),
        bus: Arc::new(InMemoryChangeEventBus::new()),
        workflow: Arc::new(InMemoryWorkflowRecorder::new()),
        notifier: Arc::new(RecordingNotificationSink::new()),
        directory: Arc::new(StaticActorDirectory::new()),
    };
    let client = DispatchClient::connect(
        ports,
        Arc::new(DefaultClock),
        ActorId::new(),
        &SyncConfig::default(),
    )
    .await?;

    let by_status = client
        .drop_task(task.id(), DropTarget::StatusColumn(TaskStatus::Pending))
        .await?;
    let by_driver = client
        .drop_task(task.id(), DropTarget::DriverColumn(lead))
        .await?;

    ensure!(by_status == TransitionOutcome::Unchanged);
    ensure!(by_driver == TransitionOutcome::Unchanged);
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dropping_on_a_driver_column_reassigns_the_lead() -> eyre::Result<()> {
    let mut dispatch = Dispatch::new();
    let ana = dispatch.dispatcher("Ana");
    let task = dispatch
        .store
        .create_task(NewTask::new(TaskKind::Transfer), Some(DriverId::new()), &[], ana)
        .await?;
    let client = dispatch.connect(ana).await?;
    let next = DriverId::new();

    let outcome = client
        .drop_task(task.id(), DropTarget::DriverColumn(next))
        .await?;

    ensure!(outcome == TransitionOutcome::Committed);
    ensure!(client.read(|board| board.lead_for(task.id()))? == Some(next));
    let rows = dispatch.store.list_assignees().await?;
    ensure!(rows.iter().any(|row| row.is_lead && row.driver_id == next));
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn dropping_into_completed_still_passes_the_guard() -> eyre::Result<()> {
    let mut dispatch = Dispatch::new();
    let ana = dispatch.dispatcher("Ana");
    let task = dispatch
        .store
        .create_task(NewTask::new(TaskKind::Rescue), None, &[], ana)
        .await?;
    dispatch
        .store
        .update_task_status(task.id(), TaskStatus::InProgress, ana, &StatusExtras::new())
        .await?;
    let client = dispatch.connect(ana).await?;

    let outcome = client
        .drop_task(task.id(), DropTarget::StatusColumn(TaskStatus::Completed))
        .await?;

    ensure!(matches!(outcome, TransitionOutcome::WorkflowOpened(_)));
    ensure!(client.task(task.id())?.map(|t| t.status()) == Some(TaskStatus::InProgress));
    Ok(())
}
