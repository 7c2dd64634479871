//! Shared fixtures: core services wired onto a migrated SQLite store

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use gather_core::application::{ConflictConfig, ConflictDetectionEngine, ReservationHoldManager};
use gather_core::domain::{EventRecord, Location, SlotDescriptor, TimeWindow, Venue, VenueDirectory};
use gather_core::port::id_provider::mocks::SequentialIdProvider;
use gather_core::port::time_provider::mocks::ManualTimeProvider;
use gather_infra_sqlite::{
    create_pool, run_migrations, SqliteEventRepository, SqliteHoldStore, SqliteNotificationLog,
    SqliteRetention, SqliteSubscriberDirectory,
};
use sqlx::SqlitePool;

pub struct Harness {
    pub pool: SqlitePool,
    pub clock: Arc<ManualTimeProvider>,
    pub events: Arc<SqliteEventRepository>,
    pub hold_store: Arc<SqliteHoldStore>,
    pub holds: Arc<ReservationHoldManager>,
    pub subscribers: Arc<SqliteSubscriberDirectory>,
    pub notification_log: Arc<SqliteNotificationLog>,
    pub retention: Arc<SqliteRetention>,
}

/// Thursday 2024-03-14 09:00 UTC
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 14, 9, 0, 0).unwrap()
}

pub async fn harness() -> Harness {
    harness_at("sqlite::memory:", 1).await
}

pub async fn harness_at(url: &str, max_connections: u32) -> Harness {
    let pool = create_pool(url, max_connections).await.unwrap();
    run_migrations(&pool).await.unwrap();
    let clock = Arc::new(ManualTimeProvider::new(start_time()));
    let hold_store = Arc::new(SqliteHoldStore::new(pool.clone()));

    Harness {
        events: Arc::new(SqliteEventRepository::new(pool.clone(), clock.clone())),
        holds: Arc::new(ReservationHoldManager::new(
            hold_store.clone(),
            Arc::new(SequentialIdProvider::new("hold")),
            clock.clone(),
        )),
        hold_store,
        subscribers: Arc::new(SqliteSubscriberDirectory::new(pool.clone())),
        notification_log: Arc::new(SqliteNotificationLog::new(pool.clone())),
        retention: Arc::new(SqliteRetention::new(pool.clone())),
        clock,
        pool,
    }
}

impl Harness {
    pub fn engine(&self) -> ConflictDetectionEngine {
        ConflictDetectionEngine::new(
            self.events.clone(),
            self.hold_store.clone(),
            self.clock.clone(),
            auckland_venues(),
            ConflictConfig::default(),
        )
    }
}

pub fn auckland_venues() -> VenueDirectory {
    VenueDirectory::new(vec![
        Venue::new("Eden Park", "Auckland").with_coordinates(-36.8750, 174.7446),
        Venue::new("Spark Arena", "Auckland").with_coordinates(-36.8475, 174.7786),
        Venue::new("Western Springs", "Auckland").with_coordinates(-36.8663, 174.7229),
        Venue::new("Te Papa", "Wellington").with_coordinates(-41.2905, 174.7821),
    ])
}

/// Single-day window in March 2024
pub fn window(day: u32, start_hour: u32, end_hour: u32) -> TimeWindow {
    TimeWindow::single_day(
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
        NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap(),
        NaiveTime::from_hms_opt(end_hour, 0, 0).unwrap(),
    )
    .unwrap()
}

pub fn event(id: &str, category: &str, city: &str, venue: &str, w: TimeWindow) -> EventRecord {
    EventRecord::new(id, category, Location::new(city, venue), w)
}

pub fn slot(category: &str, venue: &str, w: TimeWindow) -> SlotDescriptor {
    SlotDescriptor::new(category, Location::new("Auckland", venue), w)
}

/// Fresh on-disk database path; stale files from earlier runs are removed
pub fn temp_db(name: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("gather-it-{}-{}.db", name, std::process::id()));
    remove_db(&path);
    path
}

pub fn remove_db(path: &PathBuf) {
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}

pub fn sqlite_url(path: &PathBuf) -> String {
    format!("sqlite://{}", path.display())
}
