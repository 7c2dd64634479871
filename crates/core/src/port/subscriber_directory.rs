// Subscriber Directory Port (read-only)

use crate::domain::{DigestSubscriber, SubscriberSet};
use crate::error::Result;
use async_trait::async_trait;

#[async_trait]
pub trait SubscriberDirectory: Send + Sync {
    /// Email and push subscribers of one event
    async fn get_event_subscribers(&self, event_id: &str) -> Result<SubscriberSet>;

    /// Active weekly digest subscribers
    async fn get_weekly_digest_subscribers(&self) -> Result<Vec<DigestSubscriber>>;
}

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// Fixed subscriber lists, with per-event lookup failures
    #[derive(Default)]
    pub struct StaticSubscriberDirectory {
        events: Mutex<HashMap<String, SubscriberSet>>,
        digest: Mutex<Vec<DigestSubscriber>>,
        failing_events: Mutex<HashSet<String>>,
    }

    impl StaticSubscriberDirectory {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn subscribe_email(&self, event_id: &str, email: &str) {
            self.events
                .lock()
                .unwrap()
                .entry(event_id.to_string())
                .or_default()
                .email
                .push(email.to_string());
        }

        pub fn subscribe_push(&self, event_id: &str, token: &str) {
            self.events
                .lock()
                .unwrap()
                .entry(event_id.to_string())
                .or_default()
                .push
                .push(token.to_string());
        }

        pub fn add_digest_subscriber(&self, id: &str, email: &str) {
            self.digest.lock().unwrap().push(DigestSubscriber {
                id: id.to_string(),
                email: email.to_string(),
            });
        }

        pub fn fail_lookup_for(&self, event_id: &str) {
            self.failing_events
                .lock()
                .unwrap()
                .insert(event_id.to_string());
        }
    }

    #[async_trait]
    impl SubscriberDirectory for StaticSubscriberDirectory {
        async fn get_event_subscribers(&self, event_id: &str) -> Result<SubscriberSet> {
            if self.failing_events.lock().unwrap().contains(event_id) {
                return Err(AppError::Repository(format!(
                    "subscriber lookup failed for {}",
                    event_id
                )));
            }
            Ok(self
                .events
                .lock()
                .unwrap()
                .get(event_id)
                .cloned()
                .unwrap_or_default())
        }

        async fn get_weekly_digest_subscribers(&self) -> Result<Vec<DigestSubscriber>> {
            Ok(self.digest.lock().unwrap().clone())
        }
    }
}
