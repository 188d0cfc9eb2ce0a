//! Subscription freshness and reconnect backoff.

use crate::config::ReconnectPolicy;
use std::fmt;
use std::time::Duration;

/// Connection state of the change subscription, shown as a freshness
/// indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No live subscription. The board may be stale.
    Disconnected {
        /// Consecutive failed attempts so far.
        attempts: u32,
    },
    /// A subscription attempt is running.
    Connecting {
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// Both collections are subscribed and a resync was requested.
    Subscribed,
    /// Retries were exhausted.
    GaveUp,
}

impl Freshness {
    /// Returns whether the board is receiving live events.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Subscribed)
    }

    /// Returns the state name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected { .. } => "disconnected",
            Self::Connecting { .. } => "connecting",
            Self::Subscribed => "subscribed",
            Self::GaveUp => "gave_up",
        }
    }
}

impl Default for Freshness {
    fn default() -> Self {
        Self::Disconnected { attempts: 0 }
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bounded exponential backoff between subscription attempts.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    failures: u32,
}

impl Backoff {
    /// Creates a backoff with no recorded failures.
    #[must_use]
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    /// Returns consecutive failures since the last reset.
    #[must_use]
    pub const fn failures(&self) -> u32 {
        self.failures
    }

    /// Records a failure and returns the delay before the next attempt, or
    /// `None` once the attempt budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.failures = self.failures.saturating_add(1);
        if self
            .policy
            .max_attempts
            .is_some_and(|max| self.failures >= max)
        {
            return None;
        }
        let initial = self.policy.initial_delay();
        let cap = self.policy.max_delay();
        if initial.is_zero() {
            return Some(Duration::ZERO);
        }
        let steps = self.failures.saturating_sub(1);
        Some(scaled(initial, self.policy.multiplier, steps).map_or(cap, |delay| delay.min(cap)))
    }

    /// Clears recorded failures after a successful subscription.
    #[expect(
        clippy::missing_const_for_fn,
        reason = "&mut self methods cannot be const in stable Rust"
    )]
    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

/// Returns `initial * multiplier^steps`, or `None` when the result does not
/// fit in a `Duration`.
#[expect(
    clippy::float_arithmetic,
    reason = "retry delays scale by a configured float multiplier"
)]
fn scaled(initial: Duration, multiplier: f64, steps: u32) -> Option<Duration> {
    let exponent = i32::try_from(steps).ok()?;
    Duration::try_from_secs_f64(initial.as_secs_f64() * multiplier.powi(exponent)).ok()
}
