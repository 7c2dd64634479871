// SQLite HoldStore Implementation
//
// Hold creation relies on the UNIQUE(slot_key) constraint: an upsert only
// replaces the existing row when that row has already expired.

use crate::error::{corrupt_row, map_sqlx_error};
use crate::event_repository::insert_event;
use crate::row::{from_millis, to_millis, Placement, PlacementColumns, PLACEMENT_COLUMNS};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gather_core::domain::event::normalize;
use gather_core::domain::{EventRecord, PencilHold, SlotDescriptor};
use gather_core::error::Result;
use gather_core::port::{CandidateFilter, HoldStore};
use sqlx::SqlitePool;
use tracing::{debug, info};

const TABLE: &str = "holds";

#[derive(Debug, sqlx::FromRow)]
struct HoldRow {
    id: String,
    slot_key: String,
    #[sqlx(flatten)]
    placement: PlacementColumns,
    owner_id: String,
    created_at: i64,
    expires_at: i64,
}

impl HoldRow {
    fn into_hold(self) -> Result<PencilHold> {
        let window = self.placement.window(TABLE, &self.id)?;
        let location = self.placement.location();
        let created_at = from_millis(TABLE, &self.id, self.created_at)?;
        let expires_at = from_millis(TABLE, &self.id, self.expires_at)?;
        let slot = SlotDescriptor::new(self.placement.category, location, window);

        let hold = PencilHold::new(self.id.clone(), slot, self.owner_id, created_at, expires_at)
            .map_err(|e| corrupt_row(TABLE, &self.id, e))?;
        Ok(hold.with_slot_key(self.slot_key))
    }
}

fn select_holds() -> String {
    format!(
        "SELECT id, slot_key, {}, owner_id, created_at, expires_at FROM holds",
        PLACEMENT_COLUMNS
    )
}

pub struct SqliteHoldStore {
    pool: SqlitePool,
}

impl SqliteHoldStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HoldStore for SqliteHoldStore {
    async fn insert_if_vacant(&self, hold: &PencilHold) -> Result<bool> {
        let p = Placement::new(&hold.category, &hold.location, &hold.window);
        let result = sqlx::query(
            r#"
            INSERT INTO holds (
                id, slot_key, category, category_key, city, city_key, venue_name, venue_key,
                latitude, longitude, start_date, end_date, start_time, end_time,
                owner_id, created_at, expires_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(slot_key) DO UPDATE SET
                id = excluded.id,
                category = excluded.category,
                category_key = excluded.category_key,
                city = excluded.city,
                city_key = excluded.city_key,
                venue_name = excluded.venue_name,
                venue_key = excluded.venue_key,
                latitude = excluded.latitude,
                longitude = excluded.longitude,
                start_date = excluded.start_date,
                end_date = excluded.end_date,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                owner_id = excluded.owner_id,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at
            WHERE holds.expires_at < excluded.created_at
            "#,
        )
        .bind(&hold.id)
        .bind(hold.slot_key.as_str())
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
        .bind(&hold.owner_id)
        .bind(to_millis(hold.created_at))
        .bind(to_millis(hold.expires_at))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let inserted = result.rows_affected() == 1;
        debug!(hold_id = %hold.id, slot_key = %hold.slot_key, inserted, "Hold insert attempted");
        Ok(inserted)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PencilHold>> {
        let sql = format!("{} WHERE id = ?", select_holds());
        let row: Option<HoldRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        row.map(HoldRow::into_hold).transpose()
    }

    async fn extend(
        &self,
        id: &str,
        new_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query("UPDATE holds SET expires_at = ? WHERE id = ? AND expires_at >= ?")
            .bind(to_millis(new_expires_at))
            .bind(id)
            .bind(to_millis(now))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM holds WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_active(
        &self,
        filter: &CandidateFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<PencilHold>> {
        let sql = format!(
            "{} WHERE expires_at >= ?
               AND start_date <= ? AND end_date >= ?
               AND (city_key = ? OR category_key = ? OR (? IS NOT NULL AND venue_key = ?))
               AND (? IS NULL OR id != ?)
             ORDER BY start_date, start_time, id",
            select_holds()
        );
        let venue_key = filter.venue_name.as_deref().map(normalize);

        let rows: Vec<HoldRow> = sqlx::query_as(&sql)
            .bind(to_millis(now))
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

        let holds = rows
            .into_iter()
            .map(HoldRow::into_hold)
            .collect::<Result<Vec<_>>>()?;
        Ok(holds
            .into_iter()
            .filter(|h| filter.matches(&h.id, &h.category, &h.location, &h.window))
            .collect())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM holds WHERE expires_at < ?")
            .bind(to_millis(now))
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn promote(&self, hold_id: &str, event: &EventRecord, now: DateTime<Utc>) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        let removed = sqlx::query("DELETE FROM holds WHERE id = ? AND expires_at >= ?")
            .bind(hold_id)
            .bind(to_millis(now))
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;
        if removed.rows_affected() == 0 {
            // Dropping the transaction rolls it back
            return Ok(false);
        }

        insert_event(&mut *tx, event, now).await?;
        tx.commit().await.map_err(map_sqlx_error)?;

        info!(hold_id, event_id = %event.id, "Hold promoted");
        Ok(true)
    }
}
