//! Ordered task stops.

use super::TaskDomainError;
use serde::{Deserialize, Serialize};

/// On-site contact for a single stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopContact {
    /// Contact name.
    pub name: String,
    /// Contact phone number, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// One location a task visits, in route order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    distance_meters: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    contact: Option<StopContact>,
}

impl Stop {
    /// Creates a stop for the given address.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyStopAddress`] when the address is blank.
    pub fn new(address: impl Into<String>) -> Result<Self, TaskDomainError> {
        let raw = address.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TaskDomainError::EmptyStopAddress);
        }
        Ok(Self {
            address: trimmed.to_owned(),
            distance_meters: None,
            contact: None,
        })
    }

    /// Sets the geocoded distance from the previous stop.
    #[must_use]
    pub const fn with_distance_meters(mut self, distance: u32) -> Self {
        self.distance_meters = Some(distance);
        self
    }

    /// Sets the on-site contact.
    #[must_use]
    pub fn with_contact(mut self, contact: StopContact) -> Self {
        self.contact = Some(contact);
        self
    }

    /// Returns the normalized address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the geocoded distance, if known.
    #[must_use]
    pub const fn distance_meters(&self) -> Option<u32> {
        self.distance_meters
    }

    /// Returns the on-site contact, if any.
    #[must_use]
    pub const fn contact(&self) -> Option<&StopContact> {
        self.contact.as_ref()
    }
}
