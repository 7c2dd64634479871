// Job runner constants (ADR: No magic values)
use std::time::Duration;

/// Job names, also used as the `job` field in logs
pub const EVENT_REMINDER_JOB: &str = "event-reminder";
pub const DEADLINE_REMINDER_JOB: &str = "deadline-reminder";
pub const HOLD_CLEANUP_JOB: &str = "hold-cleanup";
pub const WEEKLY_DIGEST_JOB: &str = "weekly-digest";
pub const RETENTION_CLEANUP_JOB: &str = "retention-cleanup";

/// Dispatcher tick (1s)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Budget for a single repository or dispatch call (10s)
pub const DEFAULT_CALL_TIMEOUT_MS: u64 = 10_000;

/// Budget for a whole job run (15 minutes)
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 15 * 60;

/// Concurrent sends per batch
pub const DEFAULT_RECIPIENT_CONCURRENCY: usize = 8;

/// Event reminders: hourly, for events starting within 24h
pub const DEFAULT_EVENT_REMINDER_INTERVAL_SECS: u64 = 60 * 60;
pub const DEFAULT_REMINDER_WINDOW_HOURS: i64 = 24;

/// Deadline reminders: every 6h, for deadlines within 12h
pub const DEFAULT_DEADLINE_REMINDER_INTERVAL_SECS: u64 = 6 * 60 * 60;
pub const DEFAULT_DEADLINE_WINDOW_HOURS: i64 = 12;

/// Expired hold sweep: daily
pub const DEFAULT_HOLD_CLEANUP_INTERVAL_SECS: u64 = 24 * 60 * 60;

/// Weekly digest: Monday 08:00 UTC, covering the next 7 days
pub const DEFAULT_DIGEST_WEEKDAY: &str = "monday";
pub const DEFAULT_DIGEST_HOUR: u32 = 8;
pub const DEFAULT_DIGEST_MINUTE: u32 = 0;
pub const DEFAULT_DIGEST_LOOKAHEAD_DAYS: i64 = 7;

/// Longest look-ahead any notification job may use (one year)
pub const MAX_LOOKAHEAD_HOURS: i64 = 366 * 24;

/// A digest claim suppresses resends for its ISO week
pub const DIGEST_DEDUPE_DAYS: i64 = 7;

/// Retention pass: weekly
pub const DEFAULT_RETENTION_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// How often `wait_idle` re-checks the running flags
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);
