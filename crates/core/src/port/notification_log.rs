// Notification Log Port (dedupe state for reminders and digests)

use crate::error::Result;
use crate::port::NotificationKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// "Already notified" bookkeeping keyed by (kind, scope, recipient).
///
/// `scope_key` is the event id for reminders and the ISO week for digests.
/// An entry is pending from `claim` until `confirm`; a pending entry belongs to
/// a run that was cancelled or crashed mid-send, since runs of one job never
/// overlap, and the next claim takes it over.
#[async_trait]
pub trait NotificationLog: Send + Sync {
    /// Atomically record the pair as pending; false if it was already confirmed
    async fn claim(
        &self,
        kind: NotificationKind,
        scope_key: &str,
        recipient: &str,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Mark a claim as delivered
    async fn confirm(&self, kind: NotificationKind, scope_key: &str, recipient: &str)
        -> Result<()>;

    /// Forget a claim after a failed send so the next tick retries it
    async fn release(&self, kind: NotificationKind, scope_key: &str, recipient: &str)
        -> Result<()>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    type Key = (NotificationKind, String, String);

    /// Value is true once the claim is confirmed
    #[derive(Default)]
    pub struct InMemoryNotificationLog {
        entries: Mutex<HashMap<Key, bool>>,
        failing: AtomicBool,
    }

    fn key(kind: NotificationKind, scope_key: &str, recipient: &str) -> Key {
        (kind, scope_key.to_string(), recipient.to_string())
    }

    impl InMemoryNotificationLog {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        pub fn contains(&self, kind: NotificationKind, scope_key: &str, recipient: &str) -> bool {
            self.entries
                .lock()
                .unwrap()
                .contains_key(&key(kind, scope_key, recipient))
        }

        pub fn is_confirmed(&self, kind: NotificationKind, scope_key: &str, recipient: &str) -> bool {
            self.entries
                .lock()
                .unwrap()
                .get(&key(kind, scope_key, recipient))
                .copied()
                .unwrap_or(false)
        }

        pub fn len(&self) -> usize {
            self.entries.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        fn check(&self) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::Repository("notification log unreachable".into()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl NotificationLog for InMemoryNotificationLog {
        async fn claim(
            &self,
            kind: NotificationKind,
            scope_key: &str,
            recipient: &str,
            _now: DateTime<Utc>,
        ) -> Result<bool> {
            self.check()?;
            let mut entries = self.entries.lock().unwrap();
            let confirmed = entries.entry(key(kind, scope_key, recipient)).or_insert(false);
            Ok(!*confirmed)
        }

        async fn confirm(
            &self,
            kind: NotificationKind,
            scope_key: &str,
            recipient: &str,
        ) -> Result<()> {
            self.check()?;
            self.entries
                .lock()
                .unwrap()
                .insert(key(kind, scope_key, recipient), true);
            Ok(())
        }

        async fn release(
            &self,
            kind: NotificationKind,
            scope_key: &str,
            recipient: &str,
        ) -> Result<()> {
            self.check()?;
            self.entries
                .lock()
                .unwrap()
                .remove(&key(kind, scope_key, recipient));
            Ok(())
        }
    }
}
