// Notification Dispatch Port (fire-and-report, per recipient)

use crate::domain::{EventRecord, Recipient};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Kind of notification sent by the periodic jobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    EventReminder,
    DeadlineReminder,
    WeeklyDigest,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::EventReminder => "event-reminder",
            NotificationKind::DeadlineReminder => "deadline-reminder",
            NotificationKind::WeeklyDigest => "weekly-digest",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Delivery of rendered notifications (transport lives outside the core)
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationDispatch: Send + Sync {
    async fn send_event_reminder(&self, recipient: &Recipient, event: &EventRecord) -> Result<()>;

    async fn send_registration_deadline_reminder(
        &self,
        recipient: &Recipient,
        event: &EventRecord,
    ) -> Result<()>;

    async fn send_weekly_digest(&self, recipient: &Recipient, events: &[EventRecord]) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::error::AppError;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// One recorded delivery
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentNotification {
        pub kind: NotificationKind,
        pub recipient: Recipient,
        pub event_ids: Vec<String>,
    }

    /// Records successful sends; addresses in the failing set error out
    #[derive(Default)]
    pub struct RecordingDispatch {
        sent: Mutex<Vec<SentNotification>>,
        failing: Mutex<HashSet<String>>,
        delay: Mutex<Option<std::time::Duration>>,
    }

    impl RecordingDispatch {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn fail_for(&self, address: &str) {
            self.failing.lock().unwrap().insert(address.to_string());
        }

        pub fn recover(&self, address: &str) {
            self.failing.lock().unwrap().remove(address);
        }

        pub fn set_delay(&self, delay: Option<std::time::Duration>) {
            *self.delay.lock().unwrap() = delay;
        }

        pub fn sent(&self) -> Vec<SentNotification> {
            self.sent.lock().unwrap().clone()
        }

        pub fn sent_count(&self, kind: NotificationKind) -> usize {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|s| s.kind == kind)
                .count()
        }

        async fn record(
            &self,
            kind: NotificationKind,
            recipient: &Recipient,
            event_ids: Vec<String>,
        ) -> Result<()> {
            let delay = *self.delay.lock().unwrap();
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            if self.failing.lock().unwrap().contains(&recipient.address) {
                return Err(AppError::Notification(format!(
                    "{} rejected by transport",
                    recipient
                )));
            }
            self.sent.lock().unwrap().push(SentNotification {
                kind,
                recipient: recipient.clone(),
                event_ids,
            });
            Ok(())
        }
    }

    #[async_trait]
    impl NotificationDispatch for RecordingDispatch {
        async fn send_event_reminder(
            &self,
            recipient: &Recipient,
            event: &EventRecord,
        ) -> Result<()> {
            self.record(
                NotificationKind::EventReminder,
                recipient,
                vec![event.id.clone()],
            )
            .await
        }

        async fn send_registration_deadline_reminder(
            &self,
            recipient: &Recipient,
            event: &EventRecord,
        ) -> Result<()> {
            self.record(
                NotificationKind::DeadlineReminder,
                recipient,
                vec![event.id.clone()],
            )
            .await
        }

        async fn send_weekly_digest(
            &self,
            recipient: &Recipient,
            events: &[EventRecord],
        ) -> Result<()> {
            self.record(
                NotificationKind::WeeklyDigest,
                recipient,
                events.iter().map(|e| e.id.clone()).collect(),
            )
            .await
        }
    }
}
