// SQLite SubscriberDirectory Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use gather_core::domain::{Channel, DigestSubscriber, SubscriberSet};
use gather_core::error::Result;
use gather_core::port::SubscriberDirectory;
use sqlx::SqlitePool;

pub struct SqliteSubscriberDirectory {
    pool: SqlitePool,
}

impl SqliteSubscriberDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Subscribe an address to one event's reminders; repeated calls are no-ops
    pub async fn subscribe(&self, event_id: &str, channel: Channel, address: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO event_subscriptions (event_id, channel, address) VALUES (?, ?, ?)",
        )
        .bind(event_id)
        .bind(channel.as_str())
        .bind(address)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Add or reactivate a weekly digest subscriber
    pub async fn add_digest_subscriber(&self, id: &str, email: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO digest_subscribers (id, email, active) VALUES (?, ?, 1)
             ON CONFLICT(id) DO UPDATE SET email = excluded.email, active = 1",
        )
        .bind(id)
        .bind(email)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Stop the weekly digest for a subscriber; false if unknown
    pub async fn deactivate_digest_subscriber(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE digest_subscribers SET active = 0 WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SubscriberDirectory for SqliteSubscriberDirectory {
    async fn get_event_subscribers(&self, event_id: &str) -> Result<SubscriberSet> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT channel, address FROM event_subscriptions WHERE event_id = ? ORDER BY address",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut set = SubscriberSet::default();
        for (channel, address) in rows {
            if channel == Channel::Push.as_str() {
                set.push.push(address);
            } else {
                set.email.push(address);
            }
        }
        Ok(set)
    }

    async fn get_weekly_digest_subscribers(&self) -> Result<Vec<DigestSubscriber>> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT id, email FROM digest_subscribers WHERE active = 1 ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|(id, email)| DigestSubscriber { id, email })
            .collect())
    }
}
