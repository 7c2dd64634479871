// Hold Store Port (persisted pencil holds)

use crate::domain::{EventRecord, PencilHold};
use crate::error::Result;
use crate::port::CandidateFilter;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Persistence for pencil holds.
///
/// Every write is a single atomic operation per record; the store's unique
/// `slot_key` is the concurrency primitive for hold creation.
#[async_trait]
pub trait HoldStore: Send + Sync {
    /// Insert unless an unexpired hold already owns the slot key.
    ///
    /// An expired hold on the same key is replaced. Returns false when the
    /// slot is taken.
    async fn insert_if_vacant(&self, hold: &PencilHold) -> Result<bool>;

    async fn find_by_id(&self, id: &str) -> Result<Option<PencilHold>>;

    /// Move expiry forward; false if missing or already expired at `now`
    async fn extend(&self, id: &str, new_expires_at: DateTime<Utc>, now: DateTime<Utc>)
        -> Result<bool>;

    /// Returns whether a row was removed
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Unexpired holds (`expires_at >= now`) matching the filter
    async fn find_active(&self, filter: &CandidateFilter, now: DateTime<Utc>)
        -> Result<Vec<PencilHold>>;

    /// Delete holds with `expires_at < now`; returns count removed
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;

    /// Remove the unexpired hold and commit `event` as one logical operation.
    ///
    /// Returns false (and writes nothing) if the hold is missing or expired.
    async fn promote(&self, hold_id: &str, event: &EventRecord, now: DateTime<Utc>)
        -> Result<bool>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use crate::port::event_repository::mocks::InMemoryEventRepository;
    use crate::port::EventRepository;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};

    /// In-memory hold store; the map lock stands in for the unique index
    #[derive(Default)]
    pub struct InMemoryHoldStore {
        holds: Mutex<HashMap<String, PencilHold>>,
        events: Option<Arc<InMemoryEventRepository>>,
        failing: AtomicBool,
        delay: Mutex<Option<std::time::Duration>>,
    }

    impl InMemoryHoldStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Store whose `promote` commits into `events`
        pub fn with_events(events: Arc<InMemoryEventRepository>) -> Self {
            Self {
                events: Some(events),
                ..Self::default()
            }
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Every call sleeps this long first
        pub fn set_delay(&self, delay: Option<std::time::Duration>) {
            *self.delay.lock().unwrap() = delay;
        }

        /// Seed a hold without the vacancy check
        pub fn put(&self, hold: PencilHold) {
            self.holds.lock().unwrap().insert(hold.id.clone(), hold);
        }

        pub fn len(&self) -> usize {
            self.holds.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        async fn gate(&self) -> Result<()> {
            let delay = *self.delay.lock().unwrap();
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::Repository("hold store unreachable".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl HoldStore for InMemoryHoldStore {
        async fn insert_if_vacant(&self, hold: &PencilHold) -> Result<bool> {
            self.gate().await?;
            let mut holds = self.holds.lock().unwrap();
            let taken = holds
                .values()
                .find(|h| h.slot_key == hold.slot_key)
                .map(|h| (h.id.clone(), h.is_expired(hold.created_at)));
            match taken {
                Some((_, false)) => Ok(false),
                Some((stale_id, true)) => {
                    holds.remove(&stale_id);
                    holds.insert(hold.id.clone(), hold.clone());
                    Ok(true)
                }
                None => {
                    holds.insert(hold.id.clone(), hold.clone());
                    Ok(true)
                }
            }
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<PencilHold>> {
            self.gate().await?;
            Ok(self.holds.lock().unwrap().get(id).cloned())
        }

        async fn extend(
            &self,
            id: &str,
            new_expires_at: DateTime<Utc>,
            now: DateTime<Utc>,
        ) -> Result<bool> {
            self.gate().await?;
            let mut holds = self.holds.lock().unwrap();
            match holds.get_mut(id) {
                Some(h) if !h.is_expired(now) => {
                    h.expires_at = new_expires_at;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn delete(&self, id: &str) -> Result<bool> {
            self.gate().await?;
            Ok(self.holds.lock().unwrap().remove(id).is_some())
        }

        async fn find_active(
            &self,
            filter: &CandidateFilter,
            now: DateTime<Utc>,
        ) -> Result<Vec<PencilHold>> {
            self.gate().await?;
            let mut active: Vec<PencilHold> = self
                .holds
                .lock()
                .unwrap()
                .values()
                .filter(|h| !h.is_expired(now))
                .filter(|h| filter.matches(&h.id, &h.category, &h.location, &h.window))
                .cloned()
                .collect();
            active.sort_by_key(|h| h.window.starts_at());
            Ok(active)
        }

        async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
            self.gate().await?;
            let mut holds = self.holds.lock().unwrap();
            let before = holds.len();
            holds.retain(|_, h| !h.is_expired(now));
            Ok((before - holds.len()) as u64)
        }

        async fn promote(
            &self,
            hold_id: &str,
            event: &EventRecord,
            now: DateTime<Utc>,
        ) -> Result<bool> {
            self.gate().await?;
            let removed = {
                let mut holds = self.holds.lock().unwrap();
                match holds.get(hold_id) {
                    Some(h) if !h.is_expired(now) => holds.remove(hold_id),
                    _ => None,
                }
            };
            let Some(hold) = removed else {
                return Ok(false);
            };
            if let Some(events) = &self.events {
                if let Err(e) = events.insert(event).await {
                    // Undo so the hold is not lost on a failed commit
                    self.holds.lock().unwrap().insert(hold.id.clone(), hold);
                    return Err(e);
                }
            }
            Ok(true)
        }
    }
}
