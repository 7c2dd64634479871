//! Dispatch - NotificationDispatch that records deliveries in the log
//!
//! Mail and push transports live in other services; this daemon reports what
//! it would hand them.

use async_trait::async_trait;
use gather_core::domain::{EventRecord, Recipient};
use gather_core::error::Result;
use gather_core::port::{NotificationDispatch, NotificationKind};
use tracing::info;

#[derive(Debug, Default)]
pub struct TracingDispatch;

impl TracingDispatch {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationDispatch for TracingDispatch {
    async fn send_event_reminder(&self, recipient: &Recipient, event: &EventRecord) -> Result<()> {
        info!(
            kind = %NotificationKind::EventReminder,
            recipient = %recipient,
            event_id = %event.id,
            starts_at = %event.starts_at(),
            "Notification dispatched"
        );
        Ok(())
    }

    async fn send_registration_deadline_reminder(
        &self,
        recipient: &Recipient,
        event: &EventRecord,
    ) -> Result<()> {
        info!(
            kind = %NotificationKind::DeadlineReminder,
            recipient = %recipient,
            event_id = %event.id,
            deadline = ?event.registration_deadline,
            "Notification dispatched"
        );
        Ok(())
    }

    async fn send_weekly_digest(&self, recipient: &Recipient, events: &[EventRecord]) -> Result<()> {
        info!(
            kind = %NotificationKind::WeeklyDigest,
            recipient = %recipient,
            events = events.len(),
            "Notification dispatched"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use gather_core::domain::{Location, TimeWindow};

    #[tokio::test]
    async fn test_every_send_succeeds() {
        let dispatch = TracingDispatch::new();
        let event = EventRecord::new(
            "e-1",
            "music",
            Location::new("Auckland", "Spark Arena"),
            TimeWindow::single_day(
                NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
                NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            )
            .unwrap(),
        );
        let recipient = Recipient::email("a@example.com");

        assert!(dispatch.send_event_reminder(&recipient, &event).await.is_ok());
        assert!(dispatch
            .send_registration_deadline_reminder(&recipient, &event)
            .await
            .is_ok());
        assert!(dispatch
            .send_weekly_digest(&recipient, std::slice::from_ref(&event))
            .await
            .is_ok());
    }
}
