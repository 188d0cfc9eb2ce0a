//! Recording notification sink.

use async_trait::async_trait;
use std::sync::{Arc, RwLock};

use crate::task::ports::{
    NotificationError, NotificationIntent, NotificationResult, NotificationSink,
};

/// Notification sink that keeps every intent it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotificationSink {
    state: Arc<RwLock<SinkState>>,
}

#[derive(Debug, Default)]
struct SinkState {
    intents: Vec<NotificationIntent>,
    failing: bool,
}

impl RecordingNotificationSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent hand-off fail.
    pub fn fail_deliveries(&self) {
        if let Ok(mut state) = self.state.write() {
            state.failing = true;
        }
    }

    /// Returns the intents received so far.
    #[must_use]
    pub fn intents(&self) -> Vec<NotificationIntent> {
        self.state
            .read()
            .map(|state| state.intents.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn emit(&self, intent: NotificationIntent) -> NotificationResult<()> {
        let mut state = self
            .state
            .write()
            .map_err(|err| NotificationError::delivery(std::io::Error::other(err.to_string())))?;
        if state.failing {
            return Err(NotificationError::delivery(std::io::Error::other(
                "notification collaborator unavailable",
            )));
        }
        state.intents.push(intent);
        Ok(())
    }
}
