// Retention Job - scheduled removal of stale records
// (cancelled events, finished events, old dedupe entries)

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use super::constants::RETENTION_CLEANUP_JOB;
use super::{JobReport, ScheduledJob};
use crate::application::bounded::bounded;
use crate::error::Result;
use crate::port::{Retention, RetentionConfig, TimeProvider};

pub struct RetentionJob {
    retention: Arc<dyn Retention>,
    config: RetentionConfig,
    time_provider: Arc<dyn TimeProvider>,
    call_timeout: Duration,
}

impl RetentionJob {
    /// # Arguments
    /// * `retention` - Retention implementation
    /// * `config` - Retention periods per record class
    /// * `call_timeout` - Budget for the whole pass
    pub fn new(
        retention: Arc<dyn Retention>,
        config: RetentionConfig,
        time_provider: Arc<dyn TimeProvider>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            retention,
            config,
            time_provider,
            call_timeout,
        }
    }
}

#[async_trait]
impl ScheduledJob for RetentionJob {
    fn name(&self) -> &'static str {
        RETENTION_CLEANUP_JOB
    }

    async fn run(&self) -> Result<JobReport> {
        let now = self.time_provider.now();
        let stats = bounded(
            self.call_timeout,
            "run_full_retention",
            self.retention.run_full_retention(&self.config, now),
        )
        .await?;

        Ok(JobReport {
            processed: stats.total(),
            succeeded: stats.total(),
            ..JobReport::default()
        })
    }
}
