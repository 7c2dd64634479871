// Job Runner - dispatcher loop with per-job skip-if-running

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::constants::IDLE_POLL_INTERVAL;
use super::panic_guard::join_panic_message;
use super::{JobDescriptor, JobReport, JobsConfig, ShutdownToken};
use crate::error::{AppError, Result};
use crate::port::TimeProvider;

/// How one run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(JobReport),
    Failed(String),
    Panicked(String),
    TimedOut,
    /// Aborted at shutdown
    Cancelled,
}

/// Result of asking the runner to start a job
#[derive(Debug)]
pub enum TriggerOutcome {
    Started(JoinHandle<JobOutcome>),
    /// Previous run still in flight; triggers are never queued
    SkippedStillRunning,
    UnknownJob,
}

/// Clears the running flag however the run ends
struct RunningGuard(Arc<AtomicBool>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct JobSlot {
    descriptor: JobDescriptor,
    running: Arc<AtomicBool>,
    next_due: Mutex<DateTime<Utc>>,
}

/// Runs the job table: one dispatcher loop, at most one run per job
pub struct JobRunner {
    slots: Vec<JobSlot>,
    time_provider: Arc<dyn TimeProvider>,
    poll_interval: Duration,
    job_timeout: Duration,
    in_flight: Mutex<Vec<AbortHandle>>,
}

impl JobRunner {
    pub fn new(time_provider: Arc<dyn TimeProvider>, config: &JobsConfig) -> Self {
        Self {
            slots: Vec::new(),
            time_provider,
            poll_interval: config.poll_interval(),
            job_timeout: config.job_timeout(),
            in_flight: Mutex::new(Vec::new()),
        }
    }

    /// Add a job; its first due time is computed from the current time
    pub fn register(&mut self, descriptor: JobDescriptor) -> Result<()> {
        if self.slots.iter().any(|s| s.descriptor.name == descriptor.name) {
            return Err(AppError::Config(format!(
                "duplicate job name: {}",
                descriptor.name
            )));
        }
        let next_due = descriptor.schedule.next_after(self.time_provider.now());
        debug!(job = descriptor.name, next_due = %next_due, "Job registered");
        self.slots.push(JobSlot {
            descriptor,
            running: Arc::new(AtomicBool::new(false)),
            next_due: Mutex::new(next_due),
        });
        Ok(())
    }

    /// Register every descriptor, rejecting duplicates
    pub fn with_jobs(
        time_provider: Arc<dyn TimeProvider>,
        config: &JobsConfig,
        descriptors: Vec<JobDescriptor>,
    ) -> Result<Self> {
        let mut runner = Self::new(time_provider, config);
        for descriptor in descriptors {
            runner.register(descriptor)?;
        }
        Ok(runner)
    }

    pub fn job_names(&self) -> Vec<&'static str> {
        self.slots.iter().map(|s| s.descriptor.name).collect()
    }

    pub fn next_due(&self, name: &str) -> Option<DateTime<Utc>> {
        self.slot(name).map(|s| *lock(&s.next_due))
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.slot(name)
            .is_some_and(|s| s.running.load(Ordering::Acquire))
    }

    fn slot(&self, name: &str) -> Option<&JobSlot> {
        self.slots.iter().find(|s| s.descriptor.name == name)
    }

    /// Start a run now unless one is already in flight
    pub fn trigger(&self, name: &str) -> TriggerOutcome {
        let Some(slot) = self.slot(name) else {
            warn!(job = name, "Trigger for unknown job");
            return TriggerOutcome::UnknownJob;
        };

        if slot
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(job = name, "Previous run still in progress, skipping tick");
            return TriggerOutcome::SkippedStillRunning;
        }
        let guard = RunningGuard(slot.running.clone());

        let handler = slot.descriptor.handler.clone();
        let job_task = tokio::spawn(async move { handler.run().await });
        {
            let mut in_flight = lock(&self.in_flight);
            in_flight.retain(|h| !h.is_finished());
            in_flight.push(job_task.abort_handle());
        }

        let job = slot.descriptor.name;
        let job_timeout = self.job_timeout;
        TriggerOutcome::Started(tokio::spawn(async move {
            let _guard = guard;
            supervise(job, job_task, job_timeout).await
        }))
    }

    /// Trigger every job whose due time has passed; returns how many started
    pub fn fire_due(&self) -> usize {
        let now = self.time_provider.now();
        let mut started = 0;
        for slot in &self.slots {
            let due = {
                let mut next_due = lock(&slot.next_due);
                if *next_due > now {
                    false
                } else {
                    *next_due = slot.descriptor.schedule.next_after(now);
                    true
                }
            };
            if due && matches!(self.trigger(slot.descriptor.name), TriggerOutcome::Started(_)) {
                started += 1;
            }
        }
        started
    }

    /// Dispatcher loop; returns once shutdown is signalled
    pub async fn run(&self, mut shutdown: ShutdownToken) {
        info!(
            jobs = ?self.job_names(),
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Job runner started"
        );

        let mut tick = interval(self.poll_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    self.fire_due();
                }
                _ = shutdown.cancelled() => {
                    info!("Job runner shutting down");
                    break;
                }
            }
        }
    }

    /// Wait until no job is running; false if `timeout` elapsed first
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let idle = async {
            while self.slots.iter().any(|s| s.running.load(Ordering::Acquire)) {
                tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, idle).await.is_ok()
    }

    /// Abort every in-flight run (used after the shutdown grace period)
    pub fn abort_in_flight(&self) -> usize {
        let handles: Vec<AbortHandle> = lock(&self.in_flight).drain(..).collect();
        let live: Vec<&AbortHandle> = handles.iter().filter(|h| !h.is_finished()).collect();
        for handle in &live {
            handle.abort();
        }
        if !live.is_empty() {
            warn!(aborted = live.len(), "Aborted in-flight job runs");
        }
        live.len()
    }

    /// Names of jobs currently running
    pub fn running_jobs(&self) -> HashSet<&'static str> {
        self.slots
            .iter()
            .filter(|s| s.running.load(Ordering::Acquire))
            .map(|s| s.descriptor.name)
            .collect()
    }
}

/// Await one run under the job timeout and log how it ended
async fn supervise(
    job: &'static str,
    mut job_task: JoinHandle<Result<JobReport>>,
    job_timeout: Duration,
) -> JobOutcome {
    let started = Instant::now();
    let outcome = match tokio::time::timeout(job_timeout, &mut job_task).await {
        Ok(Ok(Ok(report))) => JobOutcome::Completed(report),
        Ok(Ok(Err(e))) => JobOutcome::Failed(e.to_string()),
        Ok(Err(join_err)) => match join_panic_message(join_err) {
            Some(msg) => JobOutcome::Panicked(msg),
            None => JobOutcome::Cancelled,
        },
        Err(_) => {
            job_task.abort();
            JobOutcome::TimedOut
        }
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &outcome {
        JobOutcome::Completed(report) => info!(
            job,
            elapsed_ms,
            processed = report.processed,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            "Job run completed"
        ),
        JobOutcome::Failed(e) => error!(job, elapsed_ms, error = %e, "Job run failed"),
        JobOutcome::Panicked(msg) => error!(job, elapsed_ms, panic_msg = %msg, "Job run panicked"),
        JobOutcome::TimedOut => error!(
            job,
            timeout_secs = job_timeout.as_secs(),
            "Job run timed out and was aborted"
        ),
        JobOutcome::Cancelled => warn!(job, elapsed_ms, "Job run cancelled"),
    }
    outcome
}

/// Lock that survives a poisoned mutex (a panicking job never holds these)
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
