//! Trip repository for database operations.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::TripEntity;
use crate::metrics::QueryTimer;

/// Repository for trip database operations.
#[derive(Clone)]
pub struct TripRepository {
    pool: PgPool,
}

impl TripRepository {
    /// Creates a new TripRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert an ACTIVE trip for a freshly matched ride. Transaction-scoped:
    /// commits together with the MATCHED/on_trip flips.
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        ride_id: Uuid,
        driver_id: Uuid,
        rider_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> Result<TripEntity, sqlx::Error> {
        sqlx::query_as::<_, TripEntity>(
            r#"
            INSERT INTO trips (ride_id, driver_id, rider_id, started_at, status)
            VALUES ($1, $2, $3, $4, 'ACTIVE')
            RETURNING id, ride_id, driver_id, rider_id, started_at, ended_at,
                      distance_km::float8 AS distance_km,
                      base_fare::float8 AS base_fare,
                      surge_fare::float8 AS surge_fare,
                      total_fare::float8 AS total_fare,
                      status, created_at
            "#,
        )
        .bind(ride_id)
        .bind(driver_id)
        .bind(rider_id)
        .bind(started_at)
        .fetch_one(&mut *conn)
        .await
    }

    /// Find trip by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<TripEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_trip_by_id");

        let result = sqlx::query_as::<_, TripEntity>(
            r#"
            SELECT id, ride_id, driver_id, rider_id, started_at, ended_at,
                   distance_km::float8 AS distance_km,
                   base_fare::float8 AS base_fare,
                   surge_fare::float8 AS surge_fare,
                   total_fare::float8 AS total_fare,
                   status, created_at
            FROM trips
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        result
    }

    /// Find the trip belonging to a ride (ride_id is unique).
    pub async fn find_by_ride_id(&self, ride_id: Uuid) -> Result<Option<TripEntity>, sqlx::Error> {
        sqlx::query_as::<_, TripEntity>(
            r#"
            SELECT id, ride_id, driver_id, rider_id, started_at, ended_at,
                   distance_km::float8 AS distance_km,
                   base_fare::float8 AS base_fare,
                   surge_fare::float8 AS surge_fare,
                   total_fare::float8 AS total_fare,
                   status, created_at
            FROM trips
            WHERE ride_id = $1
            "#,
        )
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Conditional ACTIVE ⇄ PAUSED flip; false when the trip was not in `from`.
    pub async fn set_status<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        from: &str,
        to: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        let result = sqlx::query(
            r#"
            UPDATE trips
            SET status = $3
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(id)
        .bind(from)
        .bind(to)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Settle a trip: COMPLETED with distance and the fare breakdown.
    /// Guarded on a running trip so a second end attempt is a no-op.
    /// Transaction-scoped.
    #[allow(clippy::too_many_arguments)]
    pub async fn complete(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        ended_at: DateTime<Utc>,
        distance_km: f64,
        base_fare: f64,
        surge_fare: f64,
        total_fare: f64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE trips
            SET status = 'COMPLETED', ended_at = $2,
                distance_km = $3::float8, base_fare = $4::float8,
                surge_fare = $5::float8, total_fare = $6::float8
            WHERE id = $1 AND status IN ('ACTIVE', 'PAUSED')
            "#,
        )
        .bind(id)
        .bind(ended_at)
        .bind(distance_km)
        .bind(base_fare)
        .bind(surge_fare)
        .bind(total_fare)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
