// Eager sweep of expired pencil holds

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::constants::HOLD_CLEANUP_JOB;
use super::{JobReport, ScheduledJob};
use crate::application::bounded::bounded;
use crate::application::hold::ReservationHoldManager;
use crate::error::Result;

pub struct HoldCleanupJob {
    holds: Arc<ReservationHoldManager>,
    call_timeout: Duration,
}

impl HoldCleanupJob {
    pub fn new(holds: Arc<ReservationHoldManager>, call_timeout: Duration) -> Self {
        Self {
            holds,
            call_timeout,
        }
    }
}

#[async_trait]
impl ScheduledJob for HoldCleanupJob {
    fn name(&self) -> &'static str {
        HOLD_CLEANUP_JOB
    }

    async fn run(&self) -> Result<JobReport> {
        let removed = bounded(self.call_timeout, "delete_expired_holds", self.holds.sweep_expired()).await?;
        Ok(JobReport {
            processed: removed,
            succeeded: removed,
            ..JobReport::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Location, PencilHold, SlotDescriptor, TimeWindow};
    use crate::port::hold_store::mocks::InMemoryHoldStore;
    use crate::port::id_provider::UuidProvider;
    use crate::port::time_provider::mocks::ManualTimeProvider;
    use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime, TimeZone, Utc};

    #[tokio::test]
    async fn test_reports_removed_count() {
        let now = Utc.with_ymd_and_hms(2024, 3, 14, 3, 0, 0).unwrap();
        let store = Arc::new(InMemoryHoldStore::new());
        for (i, minutes) in [-90, -10, 45].into_iter().enumerate() {
            let slot = SlotDescriptor::new(
                "sports",
                Location::new("Auckland", format!("Venue {}", i)),
                TimeWindow::single_day(
                    NaiveDate::from_ymd_opt(2024, 3, 20).unwrap(),
                    NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                )
                .unwrap(),
            );
            let created = now - ChronoDuration::hours(2);
            store.put(
                PencilHold::new(
                    format!("h{}", i),
                    slot,
                    "org",
                    created,
                    now + ChronoDuration::minutes(minutes),
                )
                .unwrap(),
            );
        }
        let manager = Arc::new(ReservationHoldManager::new(
            store.clone(),
            Arc::new(UuidProvider),
            Arc::new(ManualTimeProvider::new(now)),
        ));

        let report = HoldCleanupJob::new(manager, Duration::from_secs(1))
            .run()
            .await
            .unwrap();
        assert_eq!(report.succeeded, 2);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_fails_the_run() {
        let store = Arc::new(InMemoryHoldStore::new());
        store.set_failing(true);
        let manager = Arc::new(ReservationHoldManager::new(
            store,
            Arc::new(UuidProvider),
            Arc::new(ManualTimeProvider::new(Utc::now())),
        ));
        assert!(HoldCleanupJob::new(manager, Duration::from_secs(1))
            .run()
            .await
            .is_err());
    }
}
