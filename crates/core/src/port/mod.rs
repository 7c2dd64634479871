// Port Layer - Interfaces for external collaborators

pub mod event_repository;
pub mod hold_store;
pub mod id_provider; // For deterministic testing
pub mod notification;
pub mod notification_log;
pub mod retention;
pub mod subscriber_directory;
pub mod time_provider;

// Re-exports
pub use event_repository::{CandidateFilter, EventRepository};
pub use hold_store::HoldStore;
pub use id_provider::IdProvider;
pub use notification::{NotificationDispatch, NotificationKind};
pub use notification_log::NotificationLog;
pub use retention::{Retention, RetentionConfig, RetentionStats};
pub use subscriber_directory::SubscriberDirectory;
pub use time_provider::TimeProvider;
