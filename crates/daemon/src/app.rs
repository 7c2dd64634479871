//! App - wiring of the SQLite adapters into the core services

use std::sync::Arc;

use gather_core::application::{JobDependencies, JobRunner, ReservationHoldManager};
use gather_core::error::Result;
use gather_core::port::id_provider::UuidProvider;
use gather_core::port::{NotificationDispatch, TimeProvider};
use gather_infra_sqlite::{
    SqliteEventRepository, SqliteHoldStore, SqliteNotificationLog, SqliteRetention,
    SqliteSubscriberDirectory,
};
use gather_infra_sqlite::SqlitePool;

use crate::jobs::build_runner;
use crate::settings::Settings;

/// The services this process hosts
pub struct Gather {
    pub holds: Arc<ReservationHoldManager>,
    pub runner: Arc<JobRunner>,
}

impl Gather {
    pub fn wire(
        settings: &Settings,
        pool: SqlitePool,
        time_provider: Arc<dyn TimeProvider>,
        dispatch: Arc<dyn NotificationDispatch>,
    ) -> Result<Self> {
        let events = Arc::new(SqliteEventRepository::new(pool.clone(), time_provider.clone()));
        let hold_store = Arc::new(SqliteHoldStore::new(pool.clone()));

        let holds = Arc::new(
            ReservationHoldManager::new(hold_store, Arc::new(UuidProvider), time_provider.clone())
                .with_config(&settings.holds),
        );

        let deps = JobDependencies {
            events,
            holds: holds.clone(),
            subscribers: Arc::new(SqliteSubscriberDirectory::new(pool.clone())),
            dispatch,
            notification_log: Arc::new(SqliteNotificationLog::new(pool.clone())),
            retention: Arc::new(SqliteRetention::new(pool)),
            time_provider,
        };
        let runner = Arc::new(build_runner(settings, &deps)?);

        Ok(Self { holds, runner })
    }
}
