//! Reconnect state machine for the change event subscriptions.

use super::reconciler::InboxMessage;
use crate::config::ReconnectPolicy;
use crate::sync::domain::{Backoff, Freshness};
use crate::task::ports::{ChangeEventBus, ChangeSubscription, Collection, EventBusResult};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

enum Forwarding {
    InboxClosed,
    Dropped(Collection),
}

/// Keeps the task and assignment subscriptions alive and forwards their
/// events into the reconciler's inbox.
///
/// Every successful (re)subscription is followed by a resync request so
/// events missed while disconnected are recovered from the store. The
/// supervisor stops when the inbox closes or retries run out.
pub struct SubscriptionSupervisor<B>
where
    B: ChangeEventBus,
{
    bus: Arc<B>,
    inbox: mpsc::Sender<InboxMessage>,
    freshness: watch::Sender<Freshness>,
    backoff: Backoff,
}

impl<B> SubscriptionSupervisor<B>
where
    B: ChangeEventBus,
{
    /// Creates a supervisor feeding `inbox`.
    #[must_use]
    pub fn new(bus: Arc<B>, inbox: mpsc::Sender<InboxMessage>, policy: ReconnectPolicy) -> Self {
        let (freshness, _) = watch::channel(Freshness::default());
        Self {
            bus,
            inbox,
            freshness,
            backoff: Backoff::new(policy),
        }
    }

    /// Returns a receiver tracking the subscription state.
    #[must_use]
    pub fn freshness(&self) -> watch::Receiver<Freshness> {
        self.freshness.subscribe()
    }

    /// Runs the reconnect loop until the inbox closes or retries run out.
    pub async fn run(mut self) {
        loop {
            self.publish(Freshness::Connecting {
                attempt: self.backoff.failures().saturating_add(1),
            });
            match self.subscribe_all().await {
                Ok((tasks, assignees)) => {
                    self.backoff.reset();
                    self.publish(Freshness::Subscribed);
                    tracing::info!("change subscriptions established");
                    if self.inbox.send(InboxMessage::Resync).await.is_err() {
                        break;
                    }
                    match self.forward(tasks, assignees).await {
                        Forwarding::InboxClosed => break,
                        Forwarding::Dropped(collection) => {
                            tracing::warn!(%collection, "change subscription dropped");
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        attempt = self.backoff.failures().saturating_add(1),
                        error = %err,
                        "change subscription failed"
                    );
                }
            }

            let Some(delay) = self.backoff.next_delay() else {
                self.publish(Freshness::GaveUp);
                tracing::error!(
                    attempts = self.backoff.failures(),
                    "giving up on change subscriptions"
                );
                break;
            };
            self.publish(Freshness::Disconnected {
                attempts: self.backoff.failures(),
            });
            tracing::debug!(delay_ms = delay.as_millis(), "waiting before resubscribing");
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.inbox.closed() => break,
            }
        }
        tracing::debug!("subscription supervisor stopped");
    }

    async fn subscribe_all(&self) -> EventBusResult<(ChangeSubscription, ChangeSubscription)> {
        let tasks = self.bus.subscribe(Collection::Tasks).await?;
        let assignees = self.bus.subscribe(Collection::TaskAssignees).await?;
        Ok((tasks, assignees))
    }

    async fn forward(
        &self,
        mut tasks: ChangeSubscription,
        mut assignees: ChangeSubscription,
    ) -> Forwarding {
        loop {
            let (collection, next) = tokio::select! {
                event = tasks.next() => (Collection::Tasks, event),
                event = assignees.next() => (Collection::TaskAssignees, event),
                () = self.inbox.closed() => return Forwarding::InboxClosed,
            };
            let Some(event) = next else {
                return Forwarding::Dropped(collection);
            };
            if self.inbox.send(InboxMessage::Event(event)).await.is_err() {
                return Forwarding::InboxClosed;
            }
        }
    }

    fn publish(&self, state: Freshness) {
        self.freshness.send_modify(|current| *current = state);
    }
}
