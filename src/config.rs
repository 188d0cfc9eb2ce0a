//! Client synchronization settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors returned while loading or validating [`SyncConfig`].
#[derive(Debug, Error)]
pub enum SyncConfigError {
    /// The TOML text could not be parsed.
    #[error("invalid sync configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its allowed range.
    #[error("sync configuration field '{field}' {reason}")]
    OutOfRange {
        /// Offending field path.
        field: &'static str,
        /// Constraint that was violated.
        reason: &'static str,
    },
}

/// Reconnect policy of the change subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Delay before the first retry, in milliseconds.
    pub initial_delay_ms: u64,
    /// Upper bound on the retry delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth factor applied after each failed attempt.
    pub multiplier: f64,
    /// Give up after this many consecutive failures. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 250,
            max_delay_ms: 30_000,
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

impl ReconnectPolicy {
    /// Returns the first retry delay.
    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    /// Returns the retry delay cap.
    #[must_use]
    pub const fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Settings for one dispatch client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How long a local optimistic change counts as recent when an inbound
    /// update arrives, in milliseconds.
    pub conflict_window_ms: u64,
    /// Lifetime of a conflict indicator, in milliseconds.
    pub conflict_indicator_ttl_ms: u64,
    /// Capacity of the reconciliation inbox.
    pub inbox_capacity: usize,
    /// Locale used for user-visible notices.
    pub locale: String,
    /// Subscription reconnect policy.
    pub reconnect: ReconnectPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            conflict_window_ms: 5_000,
            conflict_indicator_ttl_ms: 10_000,
            inbox_capacity: 256,
            locale: "en".to_owned(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Parses and validates configuration from TOML text.
    ///
    /// Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SyncConfigError::Parse`] for malformed TOML and
    /// [`SyncConfigError::OutOfRange`] when validation fails.
    pub fn from_toml_str(text: &str) -> Result<Self, SyncConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`SyncConfigError::OutOfRange`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), SyncConfigError> {
        let out_of_range = |field, reason| Err(SyncConfigError::OutOfRange { field, reason });
        if self.conflict_window_ms == 0 {
            return out_of_range("conflict_window_ms", "must be greater than zero");
        }
        if self.conflict_indicator_ttl_ms == 0 {
            return out_of_range("conflict_indicator_ttl_ms", "must be greater than zero");
        }
        if self.inbox_capacity == 0 {
            return out_of_range("inbox_capacity", "must be greater than zero");
        }
        if self.locale.trim().is_empty() {
            return out_of_range("locale", "must not be empty");
        }
        if self.reconnect.initial_delay_ms == 0 {
            return out_of_range("reconnect.initial_delay_ms", "must be greater than zero");
        }
        if !self.reconnect.multiplier.is_finite() || self.reconnect.multiplier < 1.0 {
            return out_of_range("reconnect.multiplier", "must be a finite number of at least 1");
        }
        if self.reconnect.max_delay_ms < self.reconnect.initial_delay_ms {
            return out_of_range("reconnect.max_delay_ms", "must not be below initial_delay_ms");
        }
        Ok(())
    }

    /// Returns the conflict window.
    #[must_use]
    pub const fn conflict_window(&self) -> Duration {
        Duration::from_millis(self.conflict_window_ms)
    }

    /// Returns the conflict indicator lifetime.
    #[must_use]
    pub const fn conflict_indicator_ttl(&self) -> Duration {
        Duration::from_millis(self.conflict_indicator_ttl_ms)
    }
}
