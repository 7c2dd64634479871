//! Scheduled Jobs - periodic background work on a fixed table
//!
//! - `JobRunner`: one dispatcher loop, at most one run per job at a time
//! - Jobs: event reminders, deadline reminders, hold cleanup, weekly digest,
//!   retention
//! - Failures are isolated per recipient, per event and per job

pub mod constants;
mod deadline;
mod delivery;
mod digest;
mod hold_cleanup;
mod panic_guard;
mod reminder;
mod retention;
mod runner;
mod schedule;
mod shutdown;
mod table;

use async_trait::async_trait;
use chrono::Weekday;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, Result};

use constants::*;
pub use deadline::DeadlineReminderJob;
pub use delivery::DeliverySettings;
pub use digest::{iso_week_key, WeeklyDigestJob};
pub use hold_cleanup::HoldCleanupJob;
pub use panic_guard::{join_panic_message, panic_message};
pub use reminder::EventReminderJob;
pub use retention::RetentionJob;
pub use runner::{JobOutcome, JobRunner, TriggerOutcome};
pub use schedule::Schedule;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use table::{standard_jobs, JobDependencies};

/// A unit of periodic work
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self) -> Result<JobReport>;
}

/// Per-run counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobReport {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub skipped: u64,
}

impl JobReport {
    pub fn merge(&mut self, other: JobReport) {
        self.processed += other.processed;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

/// Table entry: what to run and when
#[derive(Clone)]
pub struct JobDescriptor {
    pub name: &'static str,
    pub schedule: Schedule,
    pub handler: Arc<dyn ScheduledJob>,
}

impl JobDescriptor {
    pub fn new(schedule: Schedule, handler: Arc<dyn ScheduledJob>) -> Self {
        Self {
            name: handler.name(),
            schedule,
            handler,
        }
    }
}

/// Cadences, windows and budgets of the periodic jobs
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub poll_interval_ms: u64,
    pub call_timeout_ms: u64,
    pub job_timeout_secs: u64,
    pub recipient_concurrency: usize,

    pub event_reminder_interval_secs: u64,
    pub reminder_window_hours: i64,

    pub deadline_reminder_interval_secs: u64,
    pub deadline_window_hours: i64,

    pub hold_cleanup_interval_secs: u64,

    /// Weekday name ("monday", "mon", ...)
    pub digest_weekday: String,
    pub digest_hour: u32,
    pub digest_minute: u32,
    pub digest_lookahead_days: i64,

    pub retention_interval_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            call_timeout_ms: DEFAULT_CALL_TIMEOUT_MS,
            job_timeout_secs: DEFAULT_JOB_TIMEOUT_SECS,
            recipient_concurrency: DEFAULT_RECIPIENT_CONCURRENCY,
            event_reminder_interval_secs: DEFAULT_EVENT_REMINDER_INTERVAL_SECS,
            reminder_window_hours: DEFAULT_REMINDER_WINDOW_HOURS,
            deadline_reminder_interval_secs: DEFAULT_DEADLINE_REMINDER_INTERVAL_SECS,
            deadline_window_hours: DEFAULT_DEADLINE_WINDOW_HOURS,
            hold_cleanup_interval_secs: DEFAULT_HOLD_CLEANUP_INTERVAL_SECS,
            digest_weekday: DEFAULT_DIGEST_WEEKDAY.to_string(),
            digest_hour: DEFAULT_DIGEST_HOUR,
            digest_minute: DEFAULT_DIGEST_MINUTE,
            digest_lookahead_days: DEFAULT_DIGEST_LOOKAHEAD_DAYS,
            retention_interval_secs: DEFAULT_RETENTION_INTERVAL_SECS,
        }
    }
}

impl JobsConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn delivery(&self) -> DeliverySettings {
        DeliverySettings {
            call_timeout: self.call_timeout(),
            concurrency: self.recipient_concurrency.max(1),
        }
    }

    /// Digest schedule from the weekday/hour/minute settings
    pub fn digest_schedule(&self) -> Result<Schedule> {
        let weekday: Weekday = self.digest_weekday.parse().map_err(|_| {
            AppError::Config(format!("invalid digest weekday: {}", self.digest_weekday))
        })?;
        Schedule::weekly(weekday, self.digest_hour, self.digest_minute)
    }

    /// Reject settings the runner cannot honour
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("poll_interval_ms", self.poll_interval_ms),
            ("call_timeout_ms", self.call_timeout_ms),
            ("job_timeout_secs", self.job_timeout_secs),
            ("event_reminder_interval_secs", self.event_reminder_interval_secs),
            ("deadline_reminder_interval_secs", self.deadline_reminder_interval_secs),
            ("hold_cleanup_interval_secs", self.hold_cleanup_interval_secs),
            ("retention_interval_secs", self.retention_interval_secs),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, v)| *v == 0) {
            return Err(AppError::Config(format!("jobs.{} must be positive", name)));
        }
        let windows_hours = [
            self.reminder_window_hours,
            self.deadline_window_hours,
            self.digest_lookahead_days.saturating_mul(24),
        ];
        if windows_hours
            .iter()
            .any(|h| *h <= 0 || *h > MAX_LOOKAHEAD_HOURS)
        {
            return Err(AppError::Config(format!(
                "jobs look-ahead windows must be positive and at most {} hours",
                MAX_LOOKAHEAD_HOURS
            )));
        }
        self.digest_schedule().map(|_| ())
    }

    /// Days a notification log entry must be kept to keep suppressing resends
    pub fn dedupe_horizon_days(&self) -> i64 {
        let hours_to_days = |hours: i64| hours.saturating_add(23) / 24;
        hours_to_days(self.reminder_window_hours)
            .max(hours_to_days(self.deadline_window_hours))
            .max(DIGEST_DEDUPE_DAYS)
    }
}
