// SQLite Retention Implementation
//
// Registrations and event subscriptions go with their event (ON DELETE CASCADE).

use crate::error::map_sqlx_error;
use crate::row::to_millis;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_core::error::Result;
use gather_core::port::Retention;
use sqlx::SqlitePool;
use tracing::debug;

pub struct SqliteRetention {
    pool: SqlitePool,
}

impl SqliteRetention {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn delete_before(&self, sql: &str, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(sql)
            .bind(to_millis(cutoff))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl Retention for SqliteRetention {
    async fn gc_cancelled_events(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let deleted = self
            .delete_before(
                "DELETE FROM events WHERE status = 'cancelled' AND updated_at < ?",
                cutoff,
            )
            .await?;
        debug!(deleted, cutoff = %cutoff, "Cancelled events removed");
        Ok(deleted)
    }

    async fn gc_past_events(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let deleted = self
            .delete_before("DELETE FROM events WHERE ends_at < ?", cutoff)
            .await?;
        debug!(deleted, cutoff = %cutoff, "Past events removed");
        Ok(deleted)
    }

    async fn gc_notification_log(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let deleted = self
            .delete_before("DELETE FROM notification_log WHERE created_at < ?", cutoff)
            .await?;
        debug!(deleted, cutoff = %cutoff, "Notification log entries removed");
        Ok(deleted)
    }
}
