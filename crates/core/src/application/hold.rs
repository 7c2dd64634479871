//! Reservation Hold Manager - pencil hold lifecycle
//!
//! create -> (extend)* -> release | promote | expire
//! - Uniqueness per slot comes from the store's unique slot key
//! - Expiry is the persisted `expires_at`; there are no per-hold timers

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::application::bounded::bounded;
use crate::domain::{EventRecord, EventStatus, PencilHold, SlotDescriptor};
use crate::error::{AppError, Result};
use crate::port::{HoldStore, IdProvider, TimeProvider};

/// Hold manager configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HoldConfig {
    /// Timeout for each hold store call
    pub call_timeout_ms: u64,
}

impl Default for HoldConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 3_000,
        }
    }
}

impl HoldConfig {
    pub fn call_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.call_timeout_ms)
    }
}

/// Attributes of the event a hold turns into
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionDetails {
    /// Use this id for the event (defaults to a fresh id)
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default = "default_status")]
    pub status: EventStatus,
    #[serde(default)]
    pub registration_deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub capacity: Option<u32>,
}

fn default_status() -> EventStatus {
    EventStatus::Published
}

impl Default for PromotionDetails {
    fn default() -> Self {
        Self {
            event_id: None,
            status: default_status(),
            registration_deadline: None,
            capacity: None,
        }
    }
}

pub struct ReservationHoldManager {
    store: Arc<dyn HoldStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    call_timeout: std::time::Duration,
}

impl ReservationHoldManager {
    pub fn new(
        store: Arc<dyn HoldStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            id_provider,
            time_provider,
            call_timeout: HoldConfig::default().call_timeout(),
        }
    }

    pub fn with_config(mut self, config: &HoldConfig) -> Self {
        self.call_timeout = config.call_timeout();
        self
    }

    /// `now + ttl`, rejecting non-positive or out-of-range ttls
    fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> Result<DateTime<Utc>> {
        if ttl <= Duration::zero() {
            return Err(AppError::Validation("hold ttl must be positive".to_string()));
        }
        now.checked_add_signed(ttl)
            .ok_or_else(|| AppError::Validation(format!("hold ttl out of range: {}", ttl)))
    }

    /// Pencil in a slot for `ttl`.
    ///
    /// Fails with `SlotAlreadyHeld` if an unexpired hold owns the same slot key.
    pub async fn create_hold(
        &self,
        slot: SlotDescriptor,
        ttl: Duration,
        owner_id: &str,
    ) -> Result<PencilHold> {
        slot.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        if owner_id.trim().is_empty() {
            return Err(AppError::Validation("owner id cannot be empty".to_string()));
        }

        let now = self.time_provider.now();
        let expires_at = Self::expiry_after(now, ttl)?;
        let hold = PencilHold::new(self.id_provider.generate_id(), slot, owner_id, now, expires_at)?;

        let inserted = bounded(
            self.call_timeout,
            "insert_if_vacant",
            self.store.insert_if_vacant(&hold),
        )
        .await?;
        if !inserted {
            debug!(slot_key = %hold.slot_key, "Slot already pencilled in");
            return Err(AppError::SlotAlreadyHeld {
                slot_key: hold.slot_key.into_inner(),
            });
        }

        info!(
            hold_id = %hold.id,
            slot_key = %hold.slot_key,
            owner_id = %hold.owner_id,
            expires_at = %hold.expires_at,
            "Hold created"
        );
        Ok(hold)
    }

    /// Push expiry to `now + new_ttl`
    pub async fn extend_hold(&self, id: &str, new_ttl: Duration) -> Result<PencilHold> {
        let now = self.time_provider.now();
        let new_expires_at = Self::expiry_after(now, new_ttl)?;
        let mut hold = self.active_hold(id, now).await?;

        let extended = bounded(
            self.call_timeout,
            "extend",
            self.store.extend(id, new_expires_at, now),
        )
        .await?;
        if !extended {
            // Expired or released between the read and the conditional update
            let current = bounded(self.call_timeout, "find_hold", self.store.find_by_id(id)).await?;
            return Err(match current {
                Some(_) => AppError::HoldExpired(id.to_string()),
                None => AppError::NotFound(format!("hold {}", id)),
            });
        }

        hold.expires_at = new_expires_at;
        debug!(hold_id = %id, expires_at = %new_expires_at, "Hold extended");
        Ok(hold)
    }

    /// Drop a hold; releasing an unknown hold is not an error
    pub async fn release_hold(&self, id: &str) -> Result<()> {
        if bounded(self.call_timeout, "delete_hold", self.store.delete(id)).await? {
            info!(hold_id = %id, "Hold released");
        } else {
            debug!(hold_id = %id, "Release of unknown hold ignored");
        }
        Ok(())
    }

    /// Turn an unexpired hold into a committed event
    pub async fn promote_hold(&self, id: &str, details: PromotionDetails) -> Result<EventRecord> {
        let now = self.time_provider.now();
        let hold = self.active_hold(id, now).await?;

        let event = EventRecord {
            id: details
                .event_id
                .unwrap_or_else(|| self.id_provider.generate_id()),
            category: hold.category,
            location: hold.location,
            window: hold.window,
            status: details.status,
            registration_deadline: details.registration_deadline,
            capacity: details.capacity,
        };

        let promoted = bounded(
            self.call_timeout,
            "promote",
            self.store.promote(id, &event, now),
        )
        .await?;
        if !promoted {
            warn!(hold_id = %id, "Hold vanished or expired during promotion");
            return Err(AppError::HoldExpired(id.to_string()));
        }

        info!(hold_id = %id, event_id = %event.id, "Hold promoted to event");
        Ok(event)
    }

    /// Delete every expired hold; returns how many were removed
    pub async fn sweep_expired(&self) -> Result<u64> {
        let removed = bounded(
            self.call_timeout,
            "delete_expired_holds",
            self.store.delete_expired(self.time_provider.now()),
        )
        .await?;
        if removed > 0 {
            info!(removed, "Expired holds swept");
        }
        Ok(removed)
    }

    async fn active_hold(&self, id: &str, now: DateTime<Utc>) -> Result<PencilHold> {
        let hold = bounded(self.call_timeout, "find_hold", self.store.find_by_id(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("hold {}", id)))?;
        if hold.is_expired(now) {
            return Err(AppError::HoldExpired(id.to_string()));
        }
        Ok(hold)
    }
}
