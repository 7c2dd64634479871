// Registration deadline reminders for users who have not signed up yet

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

use super::constants::DEADLINE_REMINDER_JOB;
use super::delivery::{Delivery, DeliverySettings};
use super::{JobReport, ScheduledJob};
use crate::application::bounded::bounded;
use crate::domain::Recipient;
use crate::error::Result;
use crate::port::{EventRepository, NotificationDispatch, NotificationKind, NotificationLog, TimeProvider};

pub struct DeadlineReminderJob {
    events: Arc<dyn EventRepository>,
    dispatch: Arc<dyn NotificationDispatch>,
    log: Arc<dyn NotificationLog>,
    time_provider: Arc<dyn TimeProvider>,
    settings: DeliverySettings,
    window_hours: i64,
}

impl DeadlineReminderJob {
    pub fn new(
        events: Arc<dyn EventRepository>,
        dispatch: Arc<dyn NotificationDispatch>,
        log: Arc<dyn NotificationLog>,
        time_provider: Arc<dyn TimeProvider>,
        settings: DeliverySettings,
        window_hours: i64,
    ) -> Self {
        Self {
            events,
            dispatch,
            log,
            time_provider,
            settings,
            window_hours,
        }
    }
}

#[async_trait]
impl ScheduledJob for DeadlineReminderJob {
    fn name(&self) -> &'static str {
        DEADLINE_REMINDER_JOB
    }

    async fn run(&self) -> Result<JobReport> {
        let now = self.time_provider.now();
        let timeout = self.settings.call_timeout;

        let closing = bounded(
            timeout,
            "find_with_deadline_within",
            self.events.find_with_deadline_within(now, self.window_hours),
        )
        .await?;

        let delivery = Delivery {
            job: DEADLINE_REMINDER_JOB,
            kind: NotificationKind::DeadlineReminder,
            log: self.log.as_ref(),
            settings: self.settings,
            now,
        };
        let dispatch = self.dispatch.as_ref();

        let mut report = JobReport::default();
        for event in &closing {
            let users = match bounded(
                timeout,
                "find_unregistered_users",
                self.events.find_unregistered_users(&event.id),
            )
            .await
            {
                Ok(users) => users,
                Err(e) => {
                    warn!(
                        job = DEADLINE_REMINDER_JOB,
                        event_id = %event.id,
                        error = %e,
                        "Unregistered user lookup failed, skipping event"
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let recipients: Vec<Recipient> = users.iter().map(|u| u.recipient()).collect();
            let batch = delivery
                .deliver(&event.id, recipients, |recipient| async move {
                    dispatch
                        .send_registration_deadline_reminder(&recipient, event)
                        .await
                })
                .instrument(info_span!("event", event_id = %event.id))
                .await;
            report.merge(batch);
        }

        info!(
            job = DEADLINE_REMINDER_JOB,
            events = closing.len(),
            sent = report.succeeded,
            failed = report.failed,
            "Deadline reminders processed"
        );
        Ok(report)
    }
}
