// Pencil Hold Domain Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{DomainError, Result};
use super::event::{normalize, Location};
use super::window::TimeWindow;

/// Hold ID
pub type HoldId = String;

/// Normalized uniqueness key for holds (venue + category + window)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotKey(String);

impl SlotKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The slot a caller wants to pencil in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDescriptor {
    pub category: String,
    pub location: Location,
    pub window: TimeWindow,
}

impl SlotDescriptor {
    pub fn new(category: impl Into<String>, location: Location, window: TimeWindow) -> Self {
        Self {
            category: category.into(),
            location,
            window,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "category cannot be empty".to_string(),
            ));
        }
        if self.location.venue_name.trim().is_empty() || self.location.city.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "venue name and city are required".to_string(),
            ));
        }
        self.window.validate()
    }

    pub fn slot_key(&self) -> SlotKey {
        SlotKey(format!(
            "{}|{}|{}|{}|{}|{}",
            normalize(&self.location.venue_name),
            normalize(&self.category),
            self.window.start_date,
            self.window.end_date,
            self.window.start_time.format("%H:%M:%S"),
            self.window.end_time.format("%H:%M:%S"),
        ))
    }
}

/// Temporary, expiring soft reservation of a slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PencilHold {
    pub id: HoldId,
    pub slot_key: SlotKey,
    pub category: String,
    pub location: Location,
    pub window: TimeWindow,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl PencilHold {
    /// Create a hold for `slot`; `expires_at` must be after `created_at`
    pub fn new(
        id: impl Into<String>,
        slot: SlotDescriptor,
        owner_id: impl Into<String>,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self> {
        if expires_at <= created_at {
            return Err(DomainError::InvalidHold(format!(
                "expires_at {} must be after created_at {}",
                expires_at, created_at
            )));
        }
        Ok(Self {
            id: id.into(),
            slot_key: slot.slot_key(),
            category: slot.category,
            location: slot.location,
            window: slot.window,
            owner_id: owner_id.into(),
            created_at,
            expires_at,
        })
    }

    /// A hold expiring exactly at `now` is still active
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }

    /// Rebuild the slot key from persisted parts (adapters store the key verbatim)
    pub fn with_slot_key(mut self, key: impl Into<String>) -> Self {
        self.slot_key = SlotKey(key.into());
        self
    }
}
