//! In-memory change event bus.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};
use tokio::sync::mpsc;

use crate::task::ports::{
    ChangeEvent, ChangeEventBus, ChangeSubscription, Collection, EventBusError, EventBusResult,
};

/// Thread-safe in-memory fan-out bus.
///
/// Every published event is delivered to every live subscription of the
/// event's collection. Tests can drop all subscriptions or refuse the next
/// subscription attempts to exercise reconnect paths.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChangeEventBus {
    state: Arc<RwLock<BusState>>,
}

#[derive(Debug, Default)]
struct BusState {
    subscribers: Vec<Subscriber>,
    refusals_remaining: usize,
    subscribe_attempts: usize,
}

#[derive(Debug)]
struct Subscriber {
    collection: Collection,
    sender: mpsc::UnboundedSender<ChangeEvent>,
}

impl InMemoryChangeEventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers an event to every live subscriber of its collection.
    ///
    /// Returns the number of subscriptions that received the event.
    pub fn publish(&self, event: &ChangeEvent) -> usize {
        let Ok(mut state) = self.state.write() else {
            tracing::error!("change event bus lock poisoned; event dropped");
            return 0;
        };
        let collection = event.record.collection();
        state
            .subscribers
            .retain(|subscriber| !subscriber.sender.is_closed());
        state
            .subscribers
            .iter()
            .filter(|subscriber| subscriber.collection == collection)
            .filter(|subscriber| subscriber.sender.send(event.clone()).is_ok())
            .count()
    }

    /// Drops every live subscription, as a network partition would.
    pub fn disconnect_all(&self) {
        if let Ok(mut state) = self.state.write() {
            state.subscribers.clear();
        }
    }

    /// Refuses the next `count` subscription attempts.
    pub fn refuse_next_subscriptions(&self, count: usize) {
        if let Ok(mut state) = self.state.write() {
            state.refusals_remaining = count;
        }
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.state.read().map_or(0, |state| {
            state
                .subscribers
                .iter()
                .filter(|subscriber| !subscriber.sender.is_closed())
                .count()
        })
    }

    /// Returns how many subscription attempts have been made, refused or not.
    #[must_use]
    pub fn subscribe_attempts(&self) -> usize {
        self.state
            .read()
            .map_or(0, |state| state.subscribe_attempts)
    }
}

#[async_trait]
impl ChangeEventBus for InMemoryChangeEventBus {
    async fn subscribe(&self, collection: Collection) -> EventBusResult<ChangeSubscription> {
        let mut state = self
            .state
            .write()
            .map_err(|err| EventBusError::transport(std::io::Error::other(err.to_string())))?;
        state.subscribe_attempts += 1;
        if state.refusals_remaining > 0 {
            state.refusals_remaining -= 1;
            return Err(EventBusError::Unavailable {
                collection,
                reason: "subscription refused".to_owned(),
            });
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        state.subscribers.push(Subscriber { collection, sender });
        Ok(ChangeSubscription::new(collection, receiver))
    }
}
