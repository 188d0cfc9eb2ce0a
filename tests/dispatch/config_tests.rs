//! Tests for client settings loaded from TOML.

use crate::support::Dispatch;
use eyre::{OptionExt, ensure};
use rstest::rstest;
use waypoint::config::{SyncConfig, SyncConfigError};
use waypoint::sync::domain::{NoticeKey, SyncError};
use waypoint::task::{
    domain::{NewTask, TaskKind, TaskPatch},
    ports::TaskStore,
};

const SPANISH_DESK: &str = r#"
locale = "es"
conflict_window_ms = 3000

[reconnect]
initial_delay_ms = 100
max_attempts = 8
"#;

#[rstest]
fn partial_settings_keep_the_remaining_defaults() -> eyre::Result<()> {
    let config = SyncConfig::from_toml_str(SPANISH_DESK)?;

    ensure!(config.locale == "es");
    ensure!(config.conflict_window_ms == 3_000);
    ensure!(config.conflict_indicator_ttl_ms == 10_000);
    ensure!(config.reconnect.max_attempts == Some(8));
    ensure!(config.reconnect.max_delay_ms == 30_000);
    Ok(())
}

#[rstest]
fn out_of_range_settings_name_the_field() {
    let result = SyncConfig::from_toml_str("inbox_capacity = 0");

    assert!(matches!(
        result,
        Err(SyncConfigError::OutOfRange {
            field: "inbox_capacity",
            ..
        })
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn client_notices_follow_the_configured_locale() -> eyre::Result<()> {
    let config = SyncConfig::from_toml_str(SPANISH_DESK)?;
    let mut dispatch = Dispatch::new().with_config(config);
    let ana = dispatch.dispatcher("Ana");
    let task = dispatch
        .store
        .create_task(NewTask::new(TaskKind::Other), None, &[], ana)
        .await?;
    let client = dispatch.connect(ana).await?;
    dispatch.store.fail_writes_to(task.id())?;

    let result = client
        .edit_fields(task.id(), &TaskPatch::new().with_details("Portón trasero"))
        .await;

    ensure!(matches!(result, Err(SyncError::WriteFailed { .. })));
    let notice = client
        .drain_notices()?
        .into_iter()
        .find(|notice| notice.key == NoticeKey::WriteFailed)
        .ok_or_eyre("write failure notice")?;
    ensure!(notice.message == "No se pudo guardar los cambios. Se deshizo el cambio.");
    Ok(())
}
