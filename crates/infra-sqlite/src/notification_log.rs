// SQLite NotificationLog Implementation

use crate::error::map_sqlx_error;
use crate::row::to_millis;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_core::error::Result;
use gather_core::port::{NotificationKind, NotificationLog};
use sqlx::SqlitePool;

pub struct SqliteNotificationLog {
    pool: SqlitePool,
}

impl SqliteNotificationLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLog for SqliteNotificationLog {
    async fn claim(
        &self,
        kind: NotificationKind,
        scope_key: &str,
        recipient: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        // A pending row left by a cancelled run is taken over; a sent row is final
        let result = sqlx::query(
            "INSERT INTO notification_log (kind, scope_key, recipient, status, created_at)
             VALUES (?, ?, ?, 'pending', ?)
             ON CONFLICT(kind, scope_key, recipient) DO UPDATE
                SET created_at = excluded.created_at
                WHERE notification_log.status = 'pending'",
        )
        .bind(kind.as_str())
        .bind(scope_key)
        .bind(recipient)
        .bind(to_millis(now))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn confirm(
        &self,
        kind: NotificationKind,
        scope_key: &str,
        recipient: &str,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE notification_log SET status = 'sent'
             WHERE kind = ? AND scope_key = ? AND recipient = ?",
        )
        .bind(kind.as_str())
        .bind(scope_key)
        .bind(recipient)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn release(
        &self,
        kind: NotificationKind,
        scope_key: &str,
        recipient: &str,
    ) -> Result<()> {
        sqlx::query("DELETE FROM notification_log WHERE kind = ? AND scope_key = ? AND recipient = ?")
            .bind(kind.as_str())
            .bind(scope_key)
            .bind(recipient)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
