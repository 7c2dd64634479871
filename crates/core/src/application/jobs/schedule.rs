// Job cadence (UTC)

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveTime, Utc, Weekday};
use std::time::Duration;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Fixed interval, first run one interval after start
    Every(Duration),
    /// Once a week at the given UTC time
    Weekly {
        weekday: Weekday,
        hour: u32,
        minute: u32,
    },
}

impl Schedule {
    pub fn weekly(weekday: Weekday, hour: u32, minute: u32) -> Result<Self> {
        if NaiveTime::from_hms_opt(hour, minute, 0).is_none() {
            return Err(AppError::Config(format!(
                "invalid weekly time {:02}:{:02}",
                hour, minute
            )));
        }
        Ok(Schedule::Weekly {
            weekday,
            hour,
            minute,
        })
    }

    /// First due time strictly after `now`
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match *self {
            Schedule::Every(interval) => {
                let interval = interval.max(Duration::from_millis(1));
                ChronoDuration::from_std(interval)
                    .ok()
                    .and_then(|d| now.checked_add_signed(d))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            }
            Schedule::Weekly {
                weekday,
                hour,
                minute,
            } => {
                let at = NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default();
                let days_ahead = (i64::from(weekday.num_days_from_monday())
                    - i64::from(now.weekday().num_days_from_monday()))
                .rem_euclid(7);
                let candidate =
                    (now.date_naive() + ChronoDuration::days(days_ahead)).and_time(at).and_utc();
                if candidate > now {
                    candidate
                } else {
                    candidate + ChronoDuration::weeks(1)
                }
            }
        }
    }
}
