// Gather Infrastructure - SQLite Adapter
// Implements: EventRepository, HoldStore, SubscriberDirectory, NotificationLog, Retention

mod connection;
mod error;
mod event_repository;
mod hold_store;
mod migration;
mod notification_log;
mod retention;
mod row;
mod subscriber_directory;

pub use connection::create_pool;
pub use event_repository::SqliteEventRepository;
pub use hold_store::SqliteHoldStore;
pub use migration::run_migrations;
pub use notification_log::SqliteNotificationLog;
pub use retention::SqliteRetention;
pub use subscriber_directory::SqliteSubscriberDirectory;

// Pool type for composition roots that do not depend on sqlx directly
pub use sqlx::SqlitePool;

// Note: sqlx::Error conversion is handled by error::map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
