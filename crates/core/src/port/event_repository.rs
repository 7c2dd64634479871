// Event Repository Port (Interface)

use crate::domain::{DateRange, EventRecord, Location, TimeWindow, User};
use crate::domain::event::normalize;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Scan filter for conflict candidates.
///
/// Matches records sharing the city OR the category OR (when set) the
/// venue, whose day span intersects `date_range`.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFilter {
    pub city: String,
    pub category: String,
    pub venue_name: Option<String>,
    pub date_range: DateRange,
    pub exclude_id: Option<String>,
}

impl CandidateFilter {
    /// In-process equivalent of the repository query (used by in-memory stores
    /// and to re-check adapter results)
    pub fn matches(&self, id: &str, category: &str, location: &Location, window: &TimeWindow) -> bool {
        if self.exclude_id.as_deref() == Some(id) {
            return false;
        }
        if !self.date_range.intersects(window) {
            return false;
        }
        let same_city = normalize(&location.city) == normalize(&self.city);
        let same_category = normalize(category) == normalize(&self.category);
        let same_venue = self
            .venue_name
            .as_deref()
            .is_some_and(|v| normalize(v) == normalize(&location.venue_name));
        same_city || same_category || same_venue
    }
}

/// Read/write access to committed events and drafts
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Non-cancelled events matching the candidate filter
    async fn find_candidates(&self, filter: &CandidateFilter) -> Result<Vec<EventRecord>>;

    /// Published events starting in `[now, now + within_hours)`, chronological
    async fn find_upcoming(&self, now: DateTime<Utc>, within_hours: i64) -> Result<Vec<EventRecord>>;

    /// Published events whose registration deadline falls in `[now, now + hours)`
    async fn find_with_deadline_within(
        &self,
        now: DateTime<Utc>,
        hours: i64,
    ) -> Result<Vec<EventRecord>>;

    /// Users who have not registered for the event
    async fn find_unregistered_users(&self, event_id: &str) -> Result<Vec<User>>;

    /// Commit a new event
    async fn insert(&self, event: &EventRecord) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<EventRecord>>;

    /// Mark as cancelled (kept for audit, excluded from scans)
    async fn cancel(&self, id: &str) -> Result<bool>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::domain::EventStatus;
    use crate::error::AppError;
    use chrono::Duration;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// In-memory event repository with switchable failure
    #[derive(Default)]
    pub struct InMemoryEventRepository {
        events: Mutex<Vec<EventRecord>>,
        users: Mutex<Vec<User>>,
        registrations: Mutex<HashMap<String, HashSet<String>>>,
        failing: AtomicBool,
        delay: Mutex<Option<std::time::Duration>>,
    }

    impl InMemoryEventRepository {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_events(events: Vec<EventRecord>) -> Self {
            let repo = Self::default();
            *repo.events.lock().unwrap() = events;
            repo
        }

        pub fn add_event(&self, event: EventRecord) {
            self.events.lock().unwrap().push(event);
        }

        pub fn add_user(&self, user: User) {
            self.users.lock().unwrap().push(user);
        }

        pub fn register(&self, event_id: &str, user_id: &str) {
            self.registrations
                .lock()
                .unwrap()
                .entry(event_id.to_string())
                .or_default()
                .insert(user_id.to_string());
        }

        /// Make every call fail with a repository error
        pub fn set_failing(&self, failing: bool) {
            self.failing.store(failing, Ordering::SeqCst);
        }

        /// Make every call sleep before answering
        pub fn set_delay(&self, delay: Option<std::time::Duration>) {
            *self.delay.lock().unwrap() = delay;
        }

        pub fn len(&self) -> usize {
            self.events.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }

        async fn gate(&self) -> Result<()> {
            let delay = *self.delay.lock().unwrap();
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            if self.failing.load(Ordering::SeqCst) {
                return Err(AppError::Repository("event store unreachable".to_string()));
            }
            Ok(())
        }

        fn active(&self) -> Vec<EventRecord> {
            let mut events: Vec<EventRecord> = self
                .events
                .lock()
                .unwrap()
                .iter()
                .filter(|e| e.status != EventStatus::Cancelled)
                .cloned()
                .collect();
            events.sort_by_key(|e| e.starts_at());
            events
        }
    }

    #[async_trait]
    impl EventRepository for InMemoryEventRepository {
        async fn find_candidates(&self, filter: &CandidateFilter) -> Result<Vec<EventRecord>> {
            self.gate().await?;
            Ok(self
                .active()
                .into_iter()
                .filter(|e| filter.matches(&e.id, &e.category, &e.location, &e.window))
                .collect())
        }

        async fn find_upcoming(
            &self,
            now: DateTime<Utc>,
            within_hours: i64,
        ) -> Result<Vec<EventRecord>> {
            self.gate().await?;
            let until = now + Duration::hours(within_hours);
            Ok(self
                .active()
                .into_iter()
                .filter(|e| e.is_published())
                .filter(|e| e.starts_at() >= now && e.starts_at() < until)
                .collect())
        }

        async fn find_with_deadline_within(
            &self,
            now: DateTime<Utc>,
            hours: i64,
        ) -> Result<Vec<EventRecord>> {
            self.gate().await?;
            let until = now + Duration::hours(hours);
            Ok(self
                .active()
                .into_iter()
                .filter(|e| e.is_published())
                .filter(|e| {
                    e.registration_deadline
                        .is_some_and(|d| d >= now && d < until)
                })
                .collect())
        }

        async fn find_unregistered_users(&self, event_id: &str) -> Result<Vec<User>> {
            self.gate().await?;
            let registrations = self.registrations.lock().unwrap();
            let registered = registrations.get(event_id);
            Ok(self
                .users
                .lock()
                .unwrap()
                .iter()
                .filter(|u| !registered.is_some_and(|r| r.contains(&u.id)))
                .cloned()
                .collect())
        }

        async fn insert(&self, event: &EventRecord) -> Result<()> {
            self.gate().await?;
            let mut events = self.events.lock().unwrap();
            if events.iter().any(|e| e.id == event.id) {
                return Err(AppError::Repository(format!(
                    "Unique constraint violation: event {}",
                    event.id
                )));
            }
            events.push(event.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<EventRecord>> {
            self.gate().await?;
            Ok(self
                .events
                .lock()
                .unwrap()
                .iter()
                .find(|e| e.id == id)
                .cloned())
        }

        async fn cancel(&self, id: &str) -> Result<bool> {
            self.gate().await?;
            let mut events = self.events.lock().unwrap();
            match events.iter_mut().find(|e| e.id == id) {
                Some(e) => {
                    e.status = EventStatus::Cancelled;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    fn window(day: u32) -> TimeWindow {
        TimeWindow::single_day(
            NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
            NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn filter() -> CandidateFilter {
        CandidateFilter {
            city: "Auckland".to_string(),
            category: "sports".to_string(),
            venue_name: Some("Eden Park".to_string()),
            date_range: window(15).date_range_with_buffer(1),
            exclude_id: Some("self".to_string()),
        }
    }

    #[test]
    fn test_filter_or_semantics() {
        let f = filter();
        let other_city_same_category = Location::new("Wellington", "Sky Stadium");
        assert!(f.matches("e1", "sports", &other_city_same_category, &window(15)));
        assert!(f.matches("e2", "music", &Location::new("auckland", "Spark Arena"), &window(15)));
        assert!(!f.matches("e3", "music", &other_city_same_category, &window(15)));
    }

    #[test]
    fn test_filter_excludes_self_and_far_dates() {
        let f = filter();
        let loc = Location::new("Auckland", "Eden Park");
        assert!(!f.matches("self", "sports", &loc, &window(15)));
        assert!(f.matches("e1", "sports", &loc, &window(16)));
        assert!(!f.matches("e1", "sports", &loc, &window(17)));
    }
}
