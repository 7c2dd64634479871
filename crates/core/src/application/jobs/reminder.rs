// Event reminders: subscribers of events starting soon

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use super::constants::EVENT_REMINDER_JOB;
use super::delivery::{Delivery, DeliverySettings};
use super::{JobReport, ScheduledJob};
use crate::application::bounded::bounded;
use crate::error::Result;
use crate::port::{
    EventRepository, NotificationDispatch, NotificationKind, NotificationLog, SubscriberDirectory,
    TimeProvider,
};

pub struct EventReminderJob {
    events: Arc<dyn EventRepository>,
    subscribers: Arc<dyn SubscriberDirectory>,
    dispatch: Arc<dyn NotificationDispatch>,
    log: Arc<dyn NotificationLog>,
    time_provider: Arc<dyn TimeProvider>,
    settings: DeliverySettings,
    window_hours: i64,
}

impl EventReminderJob {
    pub fn new(
        events: Arc<dyn EventRepository>,
        subscribers: Arc<dyn SubscriberDirectory>,
        dispatch: Arc<dyn NotificationDispatch>,
        log: Arc<dyn NotificationLog>,
        time_provider: Arc<dyn TimeProvider>,
        settings: DeliverySettings,
        window_hours: i64,
    ) -> Self {
        Self {
            events,
            subscribers,
            dispatch,
            log,
            time_provider,
            settings,
            window_hours,
        }
    }
}

#[async_trait]
impl ScheduledJob for EventReminderJob {
    fn name(&self) -> &'static str {
        EVENT_REMINDER_JOB
    }

    async fn run(&self) -> Result<JobReport> {
        let now = self.time_provider.now();
        let timeout = self.settings.call_timeout;

        let upcoming = bounded(
            timeout,
            "find_upcoming",
            self.events.find_upcoming(now, self.window_hours),
        )
        .await?;

        let delivery = Delivery {
            job: EVENT_REMINDER_JOB,
            kind: NotificationKind::EventReminder,
            log: self.log.as_ref(),
            settings: self.settings,
            now,
        };
        let dispatch = self.dispatch.as_ref();

        let mut report = JobReport::default();
        for event in &upcoming {
            let subscribers = match bounded(
                timeout,
                "get_event_subscribers",
                self.subscribers.get_event_subscribers(&event.id),
            )
            .await
            {
                Ok(s) => s,
                Err(e) => {
                    warn!(
                        job = EVENT_REMINDER_JOB,
                        event_id = %event.id,
                        error = %e,
                        "Subscriber lookup failed, skipping event"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let batch = delivery
                .deliver(&event.id, subscribers.recipients(), |recipient| async move {
                    dispatch.send_event_reminder(&recipient, event).await
                })
                .instrument(info_span!("event", event_id = %event.id))
                .await;
            report.merge(batch);
        }

        info!(
            job = EVENT_REMINDER_JOB,
            events = upcoming.len(),
            sent = report.succeeded,
            failed = report.failed,
            "Event reminders processed"
        );
        Ok(report)
    }
}
