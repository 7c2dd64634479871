// The job table: every periodic job with its cadence

use std::sync::Arc;
use std::time::Duration;

use super::{
    DeadlineReminderJob, EventReminderJob, HoldCleanupJob, JobDescriptor, JobsConfig, RetentionJob,
    Schedule, WeeklyDigestJob,
};
use crate::application::hold::ReservationHoldManager;
use crate::error::Result;
use crate::port::{
    EventRepository, NotificationDispatch, NotificationLog, Retention, RetentionConfig,
    SubscriberDirectory, TimeProvider,
};

/// Collaborators shared by the standard jobs
#[derive(Clone)]
pub struct JobDependencies {
    pub events: Arc<dyn EventRepository>,
    pub holds: Arc<ReservationHoldManager>,
    pub subscribers: Arc<dyn SubscriberDirectory>,
    pub dispatch: Arc<dyn NotificationDispatch>,
    pub notification_log: Arc<dyn NotificationLog>,
    pub retention: Arc<dyn Retention>,
    pub time_provider: Arc<dyn TimeProvider>,
}

/// Descriptors for the five standard jobs
pub fn standard_jobs(
    config: &JobsConfig,
    retention: &RetentionConfig,
    deps: &JobDependencies,
) -> Result<Vec<JobDescriptor>> {
    config.validate()?;
    retention.validate(config.dedupe_horizon_days())?;
    let delivery = config.delivery();
    let every = |secs: u64| Schedule::Every(Duration::from_secs(secs));

    Ok(vec![
        JobDescriptor::new(
            every(config.event_reminder_interval_secs),
            Arc::new(EventReminderJob::new(
                deps.events.clone(),
                deps.subscribers.clone(),
                deps.dispatch.clone(),
                deps.notification_log.clone(),
                deps.time_provider.clone(),
                delivery,
                config.reminder_window_hours,
            )),
        ),
        JobDescriptor::new(
            every(config.deadline_reminder_interval_secs),
            Arc::new(DeadlineReminderJob::new(
                deps.events.clone(),
                deps.dispatch.clone(),
                deps.notification_log.clone(),
                deps.time_provider.clone(),
                delivery,
                config.deadline_window_hours,
            )),
        ),
        JobDescriptor::new(
            every(config.hold_cleanup_interval_secs),
            Arc::new(HoldCleanupJob::new(deps.holds.clone(), config.call_timeout())),
        ),
        JobDescriptor::new(
            config.digest_schedule()?,
            Arc::new(WeeklyDigestJob::new(
                deps.events.clone(),
                deps.subscribers.clone(),
                deps.dispatch.clone(),
                deps.notification_log.clone(),
                deps.time_provider.clone(),
                delivery,
                config.digest_lookahead_days,
            )),
        ),
        JobDescriptor::new(
            every(config.retention_interval_secs),
            Arc::new(RetentionJob::new(
                deps.retention.clone(),
                retention.clone(),
                deps.time_provider.clone(),
                config.call_timeout(),
            )),
        ),
    ])
}
