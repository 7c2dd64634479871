// SQLite EventRepository Implementation

use crate::error::{corrupt_row, map_sqlx_error};
use crate::row::{from_millis, to_millis, Placement, PlacementColumns, PLACEMENT_COLUMNS};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use gather_core::domain::event::normalize;
use gather_core::domain::{EventRecord, EventStatus, User};
use gather_core::error::Result;
use gather_core::port::{CandidateFilter, EventRepository, TimeProvider};
use sqlx::{Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::debug;

const TABLE: &str = "events";

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: String,
    #[sqlx(flatten)]
    placement: PlacementColumns,
    status: String,
    registration_deadline: Option<i64>,
    capacity: Option<i64>,
}

impl EventRow {
    fn into_event(self) -> Result<EventRecord> {
        let window = self.placement.window(TABLE, &self.id)?;
        let location = self.placement.location();
        let status = EventStatus::parse(&self.status)
            .ok_or_else(|| corrupt_row(TABLE, &self.id, format!("unknown status {}", self.status)))?;
        let registration_deadline = self
            .registration_deadline
            .map(|ms| from_millis(TABLE, &self.id, ms))
            .transpose()?;
        let capacity = self
            .capacity
            .map(|c| u32::try_from(c).map_err(|e| corrupt_row(TABLE, &self.id, e)))
            .transpose()?;

        let mut event = EventRecord::new(self.id, self.placement.category, location, window);
        event.status = status;
        event.registration_deadline = registration_deadline;
        event.capacity = capacity;
        Ok(event)
    }
}

fn select_events() -> String {
    format!(
        "SELECT id, {}, status, registration_deadline, capacity FROM events",
        PLACEMENT_COLUMNS
    )
}

fn into_events(rows: Vec<EventRow>) -> Result<Vec<EventRecord>> {
    rows.into_iter().map(EventRow::into_event).collect()
}

/// Insert one event row; shared with hold promotion so both run on any executor
pub(crate) async fn insert_event<'e, E>(
    executor: E,
    event: &EventRecord,
    updated_at: DateTime<Utc>,
) -> Result<()>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let p = Placement::new(&event.category, &event.location, &event.window);
    sqlx::query(
        r#"
        INSERT INTO events (
            id, category, category_key, city, city_key, venue_name, venue_key,
            latitude, longitude, start_date, end_date, start_time, end_time,
            starts_at, ends_at, status, registration_deadline, capacity, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(event.id.clone())
    .bind(p.category)
    .bind(p.category_key)
    .bind(p.city)
    .bind(p.city_key)
    .bind(p.venue_name)
    .bind(p.venue_key)
    .bind(p.latitude)
    .bind(p.longitude)
    .bind(p.start_date)
    .bind(p.end_date)
    .bind(p.start_time)
    .bind(p.end_time)
    .bind(to_millis(event.starts_at()))
    .bind(to_millis(event.window.ends_at().and_utc()))
    .bind(event.status.as_str())
    .bind(event.registration_deadline.map(to_millis))
    .bind(event.capacity.map(i64::from))
    .bind(to_millis(updated_at))
    .execute(executor)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

pub struct SqliteEventRepository {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteEventRepository {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// Upsert a user known to the registration system
    pub async fn add_user(&self, user: &User) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, email, name) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET email = excluded.email, name = excluded.name",
        )
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.name)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Record a registration; repeated calls are no-ops
    pub async fn register(&self, event_id: &str, user_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO registrations (event_id, user_id, registered_at) VALUES (?, ?, ?)",
        )
        .bind(event_id)
        .bind(user_id)
        .bind(to_millis(self.time_provider.now()))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl EventRepository for SqliteEventRepository {
    async fn find_candidates(&self, filter: &CandidateFilter) -> Result<Vec<EventRecord>> {
        let sql = format!(
            "{} WHERE status != 'cancelled'
               AND start_date <= ? AND end_date >= ?
               AND (city_key = ? OR category_key = ? OR (? IS NOT NULL AND venue_key = ?))
               AND (? IS NULL OR id != ?)
             ORDER BY starts_at, id",
            select_events()
        );
        let venue_key = filter.venue_name.as_deref().map(normalize);

        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(filter.date_range.to.format("%Y-%m-%d").to_string())
            .bind(filter.date_range.from.format("%Y-%m-%d").to_string())
            .bind(normalize(&filter.city))
            .bind(normalize(&filter.category))
            .bind(&venue_key)
            .bind(&venue_key)
            .bind(&filter.exclude_id)
            .bind(&filter.exclude_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        // Re-check in process so the result matches the filter's own definition
        let events: Vec<EventRecord> = into_events(rows)?
            .into_iter()
            .filter(|e| filter.matches(&e.id, &e.category, &e.location, &e.window))
            .collect();
        debug!(count = events.len(), city = %filter.city, "Candidate events loaded");
        Ok(events)
    }

    async fn find_upcoming(&self, now: DateTime<Utc>, within_hours: i64) -> Result<Vec<EventRecord>> {
        let sql = format!(
            "{} WHERE status = 'published' AND starts_at >= ? AND starts_at < ?
             ORDER BY starts_at, id",
            select_events()
        );
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(to_millis(now))
            .bind(to_millis(now + Duration::hours(within_hours)))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        into_events(rows)
    }

    async fn find_with_deadline_within(
        &self,
        now: DateTime<Utc>,
        hours: i64,
    ) -> Result<Vec<EventRecord>> {
        let sql = format!(
            "{} WHERE status = 'published'
               AND registration_deadline >= ? AND registration_deadline < ?
             ORDER BY registration_deadline, id",
            select_events()
        );
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(to_millis(now))
            .bind(to_millis(now + Duration::hours(hours)))
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        into_events(rows)
    }

    async fn find_unregistered_users(&self, event_id: &str) -> Result<Vec<User>> {
        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT u.id, u.email, u.name FROM users u
             WHERE NOT EXISTS (
                 SELECT 1 FROM registrations r WHERE r.event_id = ? AND r.user_id = u.id
             )
             ORDER BY u.id",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|(id, email, name)| User { id, email, name })
            .collect())
    }

    async fn insert(&self, event: &EventRecord) -> Result<()> {
        insert_event(&self.pool, event, self.time_provider.now()).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<EventRecord>> {
        let sql = format!("{} WHERE id = ?", select_events());
        let row: Option<EventRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(EventRow::into_event).transpose()
    }

    async fn cancel(&self, id: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE events SET status = 'cancelled', updated_at = ?
             WHERE id = ? AND status != 'cancelled'",
        )
        .bind(to_millis(self.time_provider.now()))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use chrono::{NaiveDate, NaiveTime, TimeZone};
    use gather_core::domain::{DateRange, Location, TimeWindow};
    use gather_core::port::time_provider::mocks::ManualTimeProvider;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn event(id: &str, category: &str, city: &str, venue: &str, day: u32, start: u32) -> EventRecord {
        EventRecord::new(
            id,
            category,
            Location::new(city, venue),
            TimeWindow::single_day(
                date(day),
                NaiveTime::from_hms_opt(start, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(start + 2, 0, 0).unwrap(),
            )
            .unwrap(),
        )
    }

    async fn setup() -> (SqliteEventRepository, Arc<ManualTimeProvider>) {
        let pool = create_pool("sqlite::memory:", 1).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let clock = Arc::new(ManualTimeProvider::new(
            Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap(),
        ));
        (SqliteEventRepository::new(pool, clock.clone()), clock)
    }

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let (repo, _) = setup().await;
        let mut e = event("e-1", "music", "Auckland", "Spark Arena", 20, 19);
        e.location.coordinates = Some(gather_core::domain::Coordinates {
            latitude: -36.8485,
            longitude: 174.7633,
        });
        e.capacity = Some(12_000);
        e.registration_deadline = Some(Utc.with_ymd_and_hms(2024, 3, 18, 12, 0, 0).unwrap());
        repo.insert(&e).await.unwrap();

        let loaded = repo.find_by_id("e-1").await.unwrap().unwrap();
        assert_eq!(loaded, e);
        assert!(repo.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_id_is_repository_error() {
        let (repo, _) = setup().await;
        let e = event("e-1", "music", "Auckland", "Spark Arena", 20, 19);
        repo.insert(&e).await.unwrap();
        let err = repo.insert(&e).await.unwrap_err();
        assert!(err.to_string().contains("Unique constraint"));
    }

    #[tokio::test]
    async fn test_find_candidates_matches_city_category_or_venue() {
        let (repo, _) = setup().await;
        repo.insert(&event("same-city", "art", "auckland", "Gallery", 20, 9)).await.unwrap();
        repo.insert(&event("same-cat", "Music", "Wellington", "Opera House", 20, 9)).await.unwrap();
        repo.insert(&event("same-venue", "art", "Elsewhere", "SPARK ARENA", 20, 9)).await.unwrap();
        repo.insert(&event("unrelated", "art", "Wellington", "Te Papa", 20, 9)).await.unwrap();
        repo.insert(&event("out-of-range", "music", "Auckland", "Gallery", 28, 9)).await.unwrap();
        repo.insert(&event("cancelled", "music", "Auckland", "Gallery", 20, 9)).await.unwrap();
        repo.cancel("cancelled").await.unwrap();

        let filter = CandidateFilter {
            city: "Auckland".into(),
            category: "music".into(),
            venue_name: Some("Spark Arena".into()),
            date_range: DateRange::new(date(19), date(21)),
            exclude_id: None,
        };
        let mut ids: Vec<String> = repo
            .find_candidates(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["same-cat", "same-city", "same-venue"]);

        let without_venue = CandidateFilter {
            venue_name: None,
            exclude_id: Some("same-city".into()),
            ..filter
        };
        let ids: Vec<String> = repo
            .find_candidates(&without_venue)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ids, vec!["same-cat"]);
    }

    #[tokio::test]
    async fn test_multi_day_event_found_by_overlapping_range() {
        let (repo, _) = setup().await;
        let festival = EventRecord::new(
            "festival",
            "music",
            Location::new("Auckland", "Western Springs"),
            TimeWindow::new(
                date(18),
                date(24),
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            )
            .unwrap(),
        );
        repo.insert(&festival).await.unwrap();

        let filter = CandidateFilter {
            city: "Auckland".into(),
            category: "food".into(),
            venue_name: None,
            date_range: DateRange::new(date(21), date(21)),
            exclude_id: None,
        };
        assert_eq!(repo.find_candidates(&filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_upcoming_and_deadline_windows() {
        let (repo, _) = setup().await;
        let now = Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap();
        repo.insert(&event("tomorrow", "music", "Auckland", "A", 15, 8)).await.unwrap();
        repo.insert(&event("today", "music", "Auckland", "B", 14, 12)).await.unwrap();
        repo.insert(&event("started", "music", "Auckland", "C", 14, 8)).await.unwrap();
        let mut closing = event("closing", "music", "Auckland", "D", 25, 8);
        closing.registration_deadline = Some(now + Duration::hours(3));
        repo.insert(&closing).await.unwrap();

        let upcoming: Vec<String> = repo
            .find_upcoming(now, 24)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(upcoming, vec!["today", "tomorrow"]);

        let deadlines = repo.find_with_deadline_within(now, 12).await.unwrap();
        assert_eq!(deadlines.len(), 1);
        assert_eq!(deadlines[0].id, "closing");
    }

    #[tokio::test]
    async fn test_drafts_are_not_announced() {
        let (repo, _) = setup().await;
        let now = Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap();
        let mut draft = event("draft", "music", "Auckland", "A", 15, 8);
        draft.status = EventStatus::Draft;
        draft.registration_deadline = Some(now + Duration::hours(3));
        repo.insert(&draft).await.unwrap();

        assert!(repo.find_upcoming(now, 24).await.unwrap().is_empty());
        assert!(repo.find_with_deadline_within(now, 12).await.unwrap().is_empty());

        // still a candidate for conflict checks
        let filter = CandidateFilter {
            city: "Auckland".into(),
            category: "sports".into(),
            venue_name: None,
            date_range: DateRange::new(date(15), date(15)),
            exclude_id: None,
        };
        assert_eq!(repo.find_candidates(&filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unregistered_users() {
        let (repo, _) = setup().await;
        repo.insert(&event("e-1", "music", "Auckland", "A", 20, 9)).await.unwrap();
        for id in ["ana", "ben", "cai"] {
            repo.add_user(&User {
                id: id.to_string(),
                email: format!("{}@example.com", id),
                name: None,
            })
            .await
            .unwrap();
        }
        repo.register("e-1", "ben").await.unwrap();
        repo.register("e-1", "ben").await.unwrap();

        let ids: Vec<String> = repo
            .find_unregistered_users("e-1")
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(ids, vec!["ana", "cai"]);
    }

    #[tokio::test]
    async fn test_cancel_is_reported_once() {
        let (repo, _) = setup().await;
        repo.insert(&event("e-1", "music", "Auckland", "A", 20, 9)).await.unwrap();
        assert!(repo.cancel("e-1").await.unwrap());
        assert!(!repo.cancel("e-1").await.unwrap());
        assert!(!repo.cancel("missing").await.unwrap());
        let e = repo.find_by_id("e-1").await.unwrap().unwrap();
        assert!(e.is_cancelled());
    }
}
