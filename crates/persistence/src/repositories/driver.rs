//! Driver repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::DriverEntity;
use crate::metrics::QueryTimer;

/// Repository for driver database operations.
#[derive(Clone)]
pub struct DriverRepository {
    pool: PgPool,
}

impl DriverRepository {
    /// Creates a new DriverRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a new driver in status offline.
    pub async fn create(
        &self,
        name: &str,
        phone: &str,
        tier: &str,
    ) -> Result<DriverEntity, sqlx::Error> {
        sqlx::query_as::<_, DriverEntity>(
            r#"
            INSERT INTO drivers (name, phone, tier, status)
            VALUES ($1, $2, $3, 'offline')
            RETURNING id, name, phone, tier, status, lat, lng,
                      location_updated_at, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(phone)
        .bind(tier)
        .fetch_one(&self.pool)
        .await
    }

    /// Find driver by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<DriverEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_driver_by_id");

        let result = sqlx::query_as::<_, DriverEntity>(
            r#"
            SELECT id, name, phone, tier, status, lat, lng,
                   location_updated_at, created_at, updated_at
            FROM drivers
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        result
    }

    /// Tier and status only; the ping fast path uses this on tier-cache miss.
    pub async fn find_tier_status(
        &self,
        id: Uuid,
    ) -> Result<Option<(String, String)>, sqlx::Error> {
        let timer = QueryTimer::new("find_driver_tier_status");

        let result = sqlx::query_as::<_, (String, String)>(
            "SELECT tier, status FROM drivers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        result
    }

    /// Conditional status transition. Returns false when the driver was not
    /// in `from`, leaving the row untouched.
    pub async fn update_status(
        &self,
        id: Uuid,
        from: &str,
        to: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE drivers
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lock the driver row if (and only if) it is still available.
    ///
    /// SKIP LOCKED keeps concurrent matchers from queueing behind each other;
    /// a row someone else holds reads as absent and the caller moves on to
    /// the next candidate.
    pub async fn lock_available(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<DriverEntity>, sqlx::Error> {
        sqlx::query_as::<_, DriverEntity>(
            r#"
            SELECT id, name, phone, tier, status, lat, lng,
                   location_updated_at, created_at, updated_at
            FROM drivers
            WHERE id = $1 AND status = 'available'
            FOR UPDATE SKIP LOCKED
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
    }

    /// Transition a locked driver row to on_trip. Transaction-scoped.
    pub async fn mark_on_trip(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE drivers SET status = 'on_trip', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Release a driver back to available at trip end. Transaction-scoped.
    pub async fn mark_available(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE drivers SET status = 'available', updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    /// Durable position flush with last-write-wins ordering: a ping that was
    /// reordered behind a newer one must not clobber it.
    pub async fn update_location(
        &self,
        id: Uuid,
        lat: f64,
        lng: f64,
        recorded_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("update_driver_location");

        let result = sqlx::query(
            r#"
            UPDATE drivers
            SET lat = $2, lng = $3, location_updated_at = $4, updated_at = NOW()
            WHERE id = $1
              AND (location_updated_at IS NULL OR location_updated_at <= $4)
            "#,
        )
        .bind(id)
        .bind(lat)
        .bind(lng)
        .bind(recorded_at)
        .execute(&self.pool)
        .await;

        timer.record();
        Ok(result?.rows_affected() > 0)
    }
}
