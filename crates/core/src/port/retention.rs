// Retention port: removal of stale domain records
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// What a retention pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionStats {
    pub cancelled_events_deleted: u64,
    pub past_events_deleted: u64,
    pub notification_log_deleted: u64,
}

impl RetentionStats {
    pub fn total(&self) -> u64 {
        self.cancelled_events_deleted + self.past_events_deleted + self.notification_log_deleted
    }
}

/// Upper bound for any retention period (100 years)
pub const MAX_RETENTION_DAYS: i64 = 36_500;

/// Retention configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Keep cancelled events (audit trail) for this many days after cancellation
    pub cancelled_event_retention_days: i64,

    /// Keep finished events for this many days after they end
    pub past_event_retention_days: i64,

    /// Keep dedupe entries for this many days
    pub notification_log_retention_days: i64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            cancelled_event_retention_days: 90,
            past_event_retention_days: 365,
            notification_log_retention_days: 30,
        }
    }
}

impl RetentionConfig {
    /// Every period within `0..=MAX_RETENTION_DAYS`; dedupe entries must outlive
    /// `min_log_days`, the longest window in which a claim still suppresses a send
    pub fn validate(&self, min_log_days: i64) -> Result<()> {
        let periods = [
            ("cancelled_event_retention_days", self.cancelled_event_retention_days),
            ("past_event_retention_days", self.past_event_retention_days),
            ("notification_log_retention_days", self.notification_log_retention_days),
        ];
        if let Some((name, days)) = periods
            .iter()
            .find(|(_, days)| !(0..=MAX_RETENTION_DAYS).contains(days))
        {
            return Err(AppError::Config(format!(
                "retention.{} must be between 0 and {}, got {}",
                name, MAX_RETENTION_DAYS, days
            )));
        }
        if self.notification_log_retention_days < min_log_days {
            return Err(AppError::Config(format!(
                "retention.notification_log_retention_days must be at least {} days",
                min_log_days
            )));
        }
        Ok(())
    }
}

/// `now - days`, or a config error if it leaves the representable range
pub fn retention_cutoff(now: DateTime<Utc>, days: i64) -> Result<DateTime<Utc>> {
    chrono::Duration::try_days(days)
        .and_then(|period| now.checked_sub_signed(period))
        .ok_or_else(|| AppError::Config(format!("retention period out of range: {} days", days)))
}

/// Repository-defined retention rules
#[async_trait]
pub trait Retention: Send + Sync {
    /// Delete cancelled events last updated before `cutoff`
    async fn gc_cancelled_events(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Delete events that ended before `cutoff`
    async fn gc_past_events(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Delete notification log entries recorded before `cutoff`
    async fn gc_notification_log(&self, cutoff: DateTime<Utc>) -> Result<u64>;

    /// Run every retention rule based on config
    async fn run_full_retention(
        &self,
        config: &RetentionConfig,
        now: DateTime<Utc>,
    ) -> Result<RetentionStats> {
        let cancelled_cutoff = retention_cutoff(now, config.cancelled_event_retention_days)?;
        let past_cutoff = retention_cutoff(now, config.past_event_retention_days)?;
        let log_cutoff = retention_cutoff(now, config.notification_log_retention_days)?;

        let cancelled_events_deleted = self.gc_cancelled_events(cancelled_cutoff).await?;
        let past_events_deleted = self.gc_past_events(past_cutoff).await?;
        let notification_log_deleted = self.gc_notification_log(log_cutoff).await?;

        let stats = RetentionStats {
            cancelled_events_deleted,
            past_events_deleted,
            notification_log_deleted,
        };

        tracing::info!(
            cancelled_events = stats.cancelled_events_deleted,
            past_events = stats.past_events_deleted,
            notification_log = stats.notification_log_deleted,
            "Retention pass completed"
        );

        Ok(stats)
    }
}

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Returns fixed counts and records the cutoffs it was called with
    #[derive(Default)]
    pub struct FixedRetention {
        pub counts: (u64, u64, u64),
        cutoffs: Mutex<Vec<DateTime<Utc>>>,
    }

    impl FixedRetention {
        pub fn new(cancelled: u64, past: u64, log: u64) -> Self {
            Self {
                counts: (cancelled, past, log),
                cutoffs: Mutex::new(Vec::new()),
            }
        }

        pub fn cutoffs(&self) -> Vec<DateTime<Utc>> {
            self.cutoffs.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Retention for FixedRetention {
        async fn gc_cancelled_events(&self, cutoff: DateTime<Utc>) -> Result<u64> {
            self.cutoffs.lock().unwrap().push(cutoff);
            Ok(self.counts.0)
        }

        async fn gc_past_events(&self, cutoff: DateTime<Utc>) -> Result<u64> {
            self.cutoffs.lock().unwrap().push(cutoff);
            Ok(self.counts.1)
        }

        async fn gc_notification_log(&self, cutoff: DateTime<Utc>) -> Result<u64> {
            self.cutoffs.lock().unwrap().push(cutoff);
            Ok(self.counts.2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mocks::FixedRetention;
    use super::*;
    use chrono::{Duration, TimeZone};

    #[tokio::test]
    async fn test_full_retention_uses_configured_cutoffs() {
        let retention = FixedRetention::new(2, 5, 11);
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let config = RetentionConfig::default();

        let stats = retention.run_full_retention(&config, now).await.unwrap();

        assert_eq!(stats.total(), 18);
        assert_eq!(
            retention.cutoffs(),
            vec![
                now - Duration::days(90),
                now - Duration::days(365),
                now - Duration::days(30),
            ]
        );
    }

    #[tokio::test]
    async fn test_out_of_range_period_fails_without_deleting() {
        let retention = FixedRetention::new(1, 1, 1);
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let config = RetentionConfig {
            past_event_retention_days: i64::MAX,
            ..RetentionConfig::default()
        };

        let err = retention.run_full_retention(&config, now).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(retention.cutoffs().is_empty());
    }

    #[test]
    fn test_validate_bounds() {
        let ok = RetentionConfig::default();
        assert!(ok.validate(7).is_ok());

        let negative = RetentionConfig {
            cancelled_event_retention_days: -1,
            ..RetentionConfig::default()
        };
        assert!(negative.validate(7).is_err());

        let huge = RetentionConfig {
            past_event_retention_days: MAX_RETENTION_DAYS + 1,
            ..RetentionConfig::default()
        };
        assert!(huge.validate(7).is_err());

        // dedupe entries wiped while still suppressing sends
        let short_log = RetentionConfig {
            notification_log_retention_days: 0,
            ..RetentionConfig::default()
        };
        assert!(matches!(short_log.validate(7), Err(AppError::Config(_))));
    }
}
