//! Manually advanced clock for deterministic expiry windows.

use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;
use std::sync::{Arc, RwLock};

/// Clock that only moves when told to.
///
/// Clones share the same instant, so a test can hand one clone to a client
/// and advance another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// Creates a clock frozen at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// Moves the clock forward by `delta`.
    pub fn advance(&self, delta: TimeDelta) {
        if let Ok(mut now) = self.now.write() {
            *now += delta;
        }
    }

    /// Jumps the clock to `instant`.
    pub fn set(&self, instant: DateTime<Utc>) {
        if let Ok(mut now) = self.now.write() {
            *now = instant;
        }
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.now.read().map_or_else(|_| Utc::now(), |now| *now)
    }
}
