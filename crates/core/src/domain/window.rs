// Conflict window: calendar-day span + time-of-day slot

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::{DomainError, Result};

/// Longest span (in days) a single window may cover
pub const MAX_WINDOW_SPAN_DAYS: i64 = 366;

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// Time window of an event or hold.
///
/// Two shapes are supported:
/// - daily slot (`start_time < end_time`): the same `[start_time, end_time)`
///   slot repeats on every day from `start_date` to `end_date`
/// - continuous span (`start_time >= end_time`, multi-day only): runs from
///   `start_date start_time` straight through to `end_date end_time`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// Inclusive calendar-day range used for repository scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    /// True if the window's day span intersects this range
    pub fn intersects(&self, window: &TimeWindow) -> bool {
        window.start_date <= self.to && self.from <= window.end_date
    }
}

impl TimeWindow {
    /// Create a validated window
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<Self> {
        let window = Self {
            start_date,
            end_date,
            start_time,
            end_time,
        };
        window.validate()?;
        Ok(window)
    }

    /// Single-day window
    pub fn single_day(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Result<Self> {
        Self::new(date, date, start_time, end_time)
    }

    /// Check the window invariants (also used for deserialized input)
    pub fn validate(&self) -> Result<()> {
        if self.start_date > self.end_date {
            return Err(DomainError::InvalidWindow(format!(
                "start date {} is after end date {}",
                self.start_date, self.end_date
            )));
        }
        if self.start_date == self.end_date && self.start_time >= self.end_time {
            return Err(DomainError::InvalidWindow(format!(
                "start time {} must be before end time {} on a single-day window",
                self.start_time.format("%H:%M"),
                self.end_time.format("%H:%M")
            )));
        }
        if self.span_days() > MAX_WINDOW_SPAN_DAYS {
            return Err(DomainError::InvalidWindow(format!(
                "window spans {} days (max {})",
                self.span_days(),
                MAX_WINDOW_SPAN_DAYS
            )));
        }
        Ok(())
    }

    /// Number of calendar days covered (1 for a single-day window)
    pub fn span_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn is_daily_slot(&self) -> bool {
        self.start_time < self.end_time
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        self.start_date.and_time(self.start_time)
    }

    pub fn ends_at(&self) -> NaiveDateTime {
        self.end_date.and_time(self.end_time)
    }

    /// Half-open `[start, end)` slot on `day`, in seconds from midnight
    fn segment_on(&self, day: NaiveDate) -> Option<(u32, u32)> {
        if day < self.start_date || day > self.end_date {
            return None;
        }
        let start = self.start_time.num_seconds_from_midnight();
        let end = self.end_time.num_seconds_from_midnight();
        if self.is_daily_slot() {
            return Some((start, end));
        }
        let from = if day == self.start_date { start } else { 0 };
        let to = if day == self.end_date {
            end
        } else {
            SECONDS_PER_DAY
        };
        Some((from, to))
    }

    /// First calendar day on which the two windows overlap.
    ///
    /// Touching boundaries (one slot ending exactly when the other starts)
    /// do not count as overlap.
    pub fn first_overlap_day(&self, other: &TimeWindow) -> Option<NaiveDate> {
        let from = self.start_date.max(other.start_date);
        let to = self.end_date.min(other.end_date);
        if from > to {
            return None;
        }

        if self.is_daily_slot() && other.is_daily_slot() {
            let overlap = self.start_time < other.end_time && other.start_time < self.end_time;
            return overlap.then_some(from);
        }

        let mut day = from;
        while day <= to {
            if let (Some((s1, e1)), Some((s2, e2))) = (self.segment_on(day), other.segment_on(day)) {
                if s1 < e2 && s2 < e1 {
                    return Some(day);
                }
            }
            day = day.succ_opt()?;
        }
        None
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.first_overlap_day(other).is_some()
    }

    /// Same time of day, moved by `days` calendar days
    pub fn shift_days(&self, days: i64) -> Option<TimeWindow> {
        let delta = Duration::days(days);
        Some(TimeWindow {
            start_date: self.start_date.checked_add_signed(delta)?,
            end_date: self.end_date.checked_add_signed(delta)?,
            start_time: self.start_time,
            end_time: self.end_time,
        })
    }

    /// Slot moved by `minutes` within the same day(s).
    ///
    /// Returns `None` for continuous spans and for shifts that would cross
    /// midnight.
    pub fn shift_minutes(&self, minutes: i64) -> Option<TimeWindow> {
        if !self.is_daily_slot() {
            return None;
        }
        let offset = minutes * 60;
        let start = i64::from(self.start_time.num_seconds_from_midnight()) + offset;
        let end = i64::from(self.end_time.num_seconds_from_midnight()) + offset;
        if start < 0 || end >= i64::from(SECONDS_PER_DAY) {
            return None;
        }
        Some(TimeWindow {
            start_date: self.start_date,
            end_date: self.end_date,
            start_time: NaiveTime::from_num_seconds_from_midnight_opt(start as u32, 0)?,
            end_time: NaiveTime::from_num_seconds_from_midnight_opt(end as u32, 0)?,
        })
    }

    /// Day span widened by `days` on both sides (saturating at the calendar limits)
    pub fn date_range_with_buffer(&self, days: i64) -> DateRange {
        let delta = Duration::days(days);
        DateRange {
            from: self
                .start_date
                .checked_sub_signed(delta)
                .unwrap_or(NaiveDate::MIN),
            to: self
                .end_date
                .checked_add_signed(delta)
                .unwrap_or(NaiveDate::MAX),
        }
    }

    /// "09:00–17:00"
    pub fn time_label(&self) -> String {
        format!(
            "{}–{}",
            self.start_time.format("%H:%M"),
            self.end_time.format("%H:%M")
        )
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_date == self.end_date {
            write!(f, "{} {}", self.start_date, self.time_label())
        } else {
            write!(
                f,
                "{}..{} {}",
                self.start_date,
                self.end_date,
                self.time_label()
            )
        }
    }
}
