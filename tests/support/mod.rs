//! Shared wiring for dispatch client integration tests.
//!
//! Every client connected through one [`Dispatch`] shares its store, bus,
//! workflow recorder and clock, the way several dispatcher sessions share
//! one backend.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use eyre::{WrapErr, bail};
use waypoint::clock::ManualClock;
use waypoint::config::SyncConfig;
use waypoint::sync::{
    domain::Freshness,
    services::{ClientPorts, DispatchClient},
};
use waypoint::task::{
    adapters::memory::{
        InMemoryChangeEventBus, InMemoryTaskStore, RecordingNotificationSink,
        StaticActorDirectory,
    },
    domain::ActorId,
};
use waypoint::workflow::adapters::memory::InMemoryWorkflowRecorder;

/// Store type shared by connected clients.
pub type Store = InMemoryTaskStore<ManualClock>;

/// Workflow recorder shared by connected clients.
pub type Recorder = InMemoryWorkflowRecorder<ManualClock>;

/// Client type produced by [`Dispatch::connect`].
pub type Client = DispatchClient<Store, Recorder, RecordingNotificationSink, ManualClock>;

const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Backend shared by every dispatcher in a test.
pub struct Dispatch {
    /// Clock shared by the store, the recorder and every client.
    pub clock: Arc<ManualClock>,
    /// Change event bus.
    pub bus: InMemoryChangeEventBus,
    /// Authoritative task store.
    pub store: Arc<Store>,
    /// Checklist and evidence storage.
    pub recorder: Arc<Recorder>,
    /// Captured notification intents.
    pub notifier: Arc<RecordingNotificationSink>,
    directory: StaticActorDirectory,
    config: SyncConfig,
}

impl Dispatch {
    /// Creates an empty backend with the clock frozen at a fixed morning.
    #[must_use]
    pub fn new() -> Self {
        let start = Utc
            .with_ymd_and_hms(2025, 3, 14, 9, 0, 0)
            .single()
            .unwrap_or_default();
        let clock = Arc::new(ManualClock::new(start));
        let bus = InMemoryChangeEventBus::new();
        Self {
            store: Arc::new(InMemoryTaskStore::with_clock(bus.clone(), Arc::clone(&clock))),
            recorder: Arc::new(InMemoryWorkflowRecorder::with_clock(Arc::clone(&clock))),
            notifier: Arc::new(RecordingNotificationSink::new()),
            directory: StaticActorDirectory::new(),
            config: SyncConfig::default(),
            clock,
            bus,
        }
    }

    /// Replaces the settings used by later connections.
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a named dispatcher and returns its actor id.
    pub fn dispatcher(&mut self, name: &str) -> ActorId {
        let actor = ActorId::new();
        self.directory = self.directory.clone().with_actor(actor, name);
        actor
    }

    /// Connects a client for `actor` and waits for its live subscription.
    ///
    /// # Errors
    ///
    /// Returns an error when the initial load fails or the subscription does
    /// not come up in time.
    pub async fn connect(&self, actor: ActorId) -> eyre::Result<Client> {
        let ports = ClientPorts {
            store: Arc::clone(&self.store),
            bus: Arc::new(self.bus.clone()),
            workflow: Arc::clone(&self.recorder),
            notifier: Arc::clone(&self.notifier),
            directory: Arc::new(self.directory.clone()),
        };
        let client = DispatchClient::connect(ports, Arc::clone(&self.clock), actor, &self.config)
            .await
            .wrap_err("connect dispatch client")?;
        let mut freshness = client.freshness();
        tokio::time::timeout(
            SETTLE_TIMEOUT,
            freshness.wait_for(|state| *state == Freshness::Subscribed),
        )
        .await
        .wrap_err("subscription did not come up")?
        .wrap_err("subscription supervisor stopped")?;
        Ok(client)
    }
}

impl Default for Dispatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls `check` until it holds or the settle timeout passes.
///
/// Inbound events are applied by a background task, so assertions about
/// another client's writes have to wait for them to land.
///
/// # Errors
///
/// Returns an error when `check` fails or never holds.
pub async fn eventually<F>(what: &str, mut check: F) -> eyre::Result<()>
where
    F: FnMut() -> eyre::Result<bool>,
{
    let deadline = tokio::time::Instant::now() + SETTLE_TIMEOUT;
    loop {
        if check()? {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            bail!("timed out waiting for {what}");
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
