// Weekly digest of upcoming events, at most once per subscriber per ISO week

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;
use tracing::info;

use super::constants::WEEKLY_DIGEST_JOB;
use super::delivery::{Delivery, DeliverySettings};
use super::{JobReport, ScheduledJob};
use crate::application::bounded::bounded;
use crate::domain::Recipient;
use crate::error::Result;
use crate::port::{
    EventRepository, NotificationDispatch, NotificationKind, NotificationLog, SubscriberDirectory,
    TimeProvider,
};

/// Dedupe scope of a digest ("2024-W11")
pub fn iso_week_key(at: DateTime<Utc>) -> String {
    let week = at.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

pub struct WeeklyDigestJob {
    events: Arc<dyn EventRepository>,
    subscribers: Arc<dyn SubscriberDirectory>,
    dispatch: Arc<dyn NotificationDispatch>,
    log: Arc<dyn NotificationLog>,
    time_provider: Arc<dyn TimeProvider>,
    settings: DeliverySettings,
    lookahead_days: i64,
}

impl WeeklyDigestJob {
    pub fn new(
        events: Arc<dyn EventRepository>,
        subscribers: Arc<dyn SubscriberDirectory>,
        dispatch: Arc<dyn NotificationDispatch>,
        log: Arc<dyn NotificationLog>,
        time_provider: Arc<dyn TimeProvider>,
        settings: DeliverySettings,
        lookahead_days: i64,
    ) -> Self {
        Self {
            events,
            subscribers,
            dispatch,
            log,
            time_provider,
            settings,
            lookahead_days,
        }
    }
}

#[async_trait]
impl ScheduledJob for WeeklyDigestJob {
    fn name(&self) -> &'static str {
        WEEKLY_DIGEST_JOB
    }

    async fn run(&self) -> Result<JobReport> {
        let now = self.time_provider.now();
        let timeout = self.settings.call_timeout;

        let upcoming = bounded(
            timeout,
            "find_upcoming",
            self.events.find_upcoming(now, self.lookahead_days * 24),
        )
        .await?;
        if upcoming.is_empty() {
            info!(job = WEEKLY_DIGEST_JOB, "No upcoming events, digest skipped");
            return Ok(JobReport::default());
        }

        let subscribers = bounded(
            timeout,
            "get_weekly_digest_subscribers",
            self.subscribers.get_weekly_digest_subscribers(),
        )
        .await?;
        let recipients: Vec<Recipient> = subscribers.iter().map(|s| s.recipient()).collect();

        let week = iso_week_key(now);
        let delivery = Delivery {
            job: WEEKLY_DIGEST_JOB,
            kind: NotificationKind::WeeklyDigest,
            log: self.log.as_ref(),
            settings: self.settings,
            now,
        };
        let dispatch = self.dispatch.as_ref();
        let events = upcoming.as_slice();

        let report = delivery
            .deliver(&week, recipients, |recipient| async move {
                dispatch.send_weekly_digest(&recipient, events).await
            })
            .await;

        info!(
            job = WEEKLY_DIGEST_JOB,
            week = %week,
            events = upcoming.len(),
            sent = report.succeeded,
            failed = report.failed,
            "Weekly digest processed"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventRecord, Location, TimeWindow};
    use crate::port::event_repository::mocks::InMemoryEventRepository;
    use crate::port::notification::mocks::RecordingDispatch;
    use crate::port::notification_log::mocks::InMemoryNotificationLog;
    use crate::port::subscriber_directory::mocks::StaticSubscriberDirectory;
    use crate::port::time_provider::mocks::ManualTimeProvider;
    use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime, TimeZone};
    use std::time::Duration;

    struct Fixture {
        events: Arc<InMemoryEventRepository>,
        dispatch: Arc<RecordingDispatch>,
        clock: Arc<ManualTimeProvider>,
        job: WeeklyDigestJob,
    }

    fn fixture() -> Fixture {
        let events = Arc::new(InMemoryEventRepository::new());
        let subscribers = Arc::new(StaticSubscriberDirectory::new());
        subscribers.add_digest_subscriber("s1", "one@example.com");
        subscribers.add_digest_subscriber("s2", "two@example.com");
        let dispatch = Arc::new(RecordingDispatch::new());
        // Monday 2024-03-11 08:00 UTC
        let clock = Arc::new(ManualTimeProvider::new(
            Utc.with_ymd_and_hms(2024, 3, 11, 8, 0, 0).unwrap(),
        ));
        let job = WeeklyDigestJob::new(
            events.clone(),
            subscribers,
            dispatch.clone(),
            Arc::new(InMemoryNotificationLog::new()),
            clock.clone(),
            DeliverySettings {
                call_timeout: Duration::from_secs(1),
                concurrency: 4,
            },
            7,
        );
        Fixture {
            events,
            dispatch,
            clock,
            job,
        }
    }

    fn event_on(id: &str, day: u32) -> EventRecord {
        EventRecord::new(
            id,
            "music",
            Location::new("Auckland", "Spark Arena"),
            TimeWindow::single_day(
                NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
                NaiveTime::from_hms_opt(19, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(23, 0, 0).unwrap(),
            )
            .unwrap(),
        )
    }

    #[test]
    fn test_iso_week_key() {
        let monday = Utc.with_ymd_and_hms(2024, 3, 11, 8, 0, 0).unwrap();
        assert_eq!(iso_week_key(monday), "2024-W11");
        // ISO year differs from calendar year at the boundary
        let new_years_eve = Utc.with_ymd_and_hms(2024, 12, 30, 8, 0, 0).unwrap();
        assert_eq!(iso_week_key(new_years_eve), "2025-W01");
    }

    #[tokio::test]
    async fn test_digest_sent_once_per_week() {
        let f = fixture();
        f.events.add_event(event_on("gig-1", 13));
        f.events.add_event(event_on("gig-2", 16));
        f.events.add_event(event_on("next-month", 30));

        let report = f.job.run().await.unwrap();
        assert_eq!(report.succeeded, 2);
        let sent = f.dispatch.sent();
        assert_eq!(sent[0].event_ids, vec!["gig-1", "gig-2"]);

        // a rerun later the same week sends nothing
        f.clock.advance(ChronoDuration::hours(30));
        let report = f.job.run().await.unwrap();
        assert_eq!(report.skipped, 2);
        assert_eq!(f.dispatch.sent_count(NotificationKind::WeeklyDigest), 2);

        // next week is a new scope
        f.events.add_event(event_on("gig-3", 20));
        f.clock.advance(ChronoDuration::days(6));
        let report = f.job.run().await.unwrap();
        assert_eq!(report.succeeded, 2);
    }

    #[tokio::test]
    async fn test_empty_week_sends_nothing() {
        let f = fixture();
        f.events.add_event(event_on("next-month", 30));

        let report = f.job.run().await.unwrap();
        assert_eq!(report, JobReport::default());
        assert!(f.dispatch.sent().is_empty());
    }
}
