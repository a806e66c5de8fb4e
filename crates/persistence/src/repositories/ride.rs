//! Ride repository for database operations.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::RideEntity;
use crate::metrics::QueryTimer;

/// Input data for inserting a ride record.
#[derive(Debug, Clone)]
pub struct CreateRideInput {
    pub rider_id: Uuid,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dest_lat: f64,
    pub dest_lng: f64,
    pub tier: String,
    pub payment_method: String,
    pub surge_multiplier: f64,
    pub idempotency_key: Option<String>,
}

/// Repository for ride database operations.
#[derive(Clone)]
pub struct RideRepository {
    pool: PgPool,
}

impl RideRepository {
    /// Creates a new RideRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new ride in status REQUESTED, capturing the surge multiplier.
    pub async fn create(&self, input: CreateRideInput) -> Result<RideEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_ride");

        let result = sqlx::query_as::<_, RideEntity>(
            r#"
            INSERT INTO rides (
                rider_id, pickup_lat, pickup_lng, dest_lat, dest_lng,
                tier, status, payment_method, surge_multiplier, idempotency_key
            )
            VALUES ($1, $2, $3, $4, $5, $6, 'REQUESTED', $7, $8::float8, $9)
            RETURNING id, rider_id, driver_id, pickup_lat, pickup_lng,
                      dest_lat, dest_lng, tier, status, payment_method,
                      surge_multiplier::float8 AS surge_multiplier,
                      idempotency_key, created_at, updated_at
            "#,
        )
        .bind(input.rider_id)
        .bind(input.pickup_lat)
        .bind(input.pickup_lng)
        .bind(input.dest_lat)
        .bind(input.dest_lng)
        .bind(&input.tier)
        .bind(&input.payment_method)
        .bind(input.surge_multiplier)
        .bind(&input.idempotency_key)
        .fetch_one(&self.pool)
        .await;

        timer.record();
        result
    }

    /// Find ride by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RideEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_ride_by_id");

        let result = sqlx::query_as::<_, RideEntity>(
            r#"
            SELECT id, rider_id, driver_id, pickup_lat, pickup_lng,
                   dest_lat, dest_lng, tier, status, payment_method,
                   surge_multiplier::float8 AS surge_multiplier,
                   idempotency_key, created_at, updated_at
            FROM rides
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;

        timer.record();
        result
    }

    /// Lock the ride row if it is still REQUESTED.
    ///
    /// Blocking lock: REQUESTED is contended only between matchers for the
    /// same ride, and whoever wins flips the status out from under the loser.
    pub async fn lock_requested(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<RideEntity>, sqlx::Error> {
        sqlx::query_as::<_, RideEntity>(
            r#"
            SELECT id, rider_id, driver_id, pickup_lat, pickup_lng,
                   dest_lat, dest_lng, tier, status, payment_method,
                   surge_multiplier::float8 AS surge_multiplier,
                   idempotency_key, created_at, updated_at
            FROM rides
            WHERE id = $1 AND status = 'REQUESTED'
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
    }

    /// Lock the ride row if it is MATCHED and assigned to this driver.
    pub async fn lock_matched_for_driver(
        &self,
        conn: &mut PgConnection,
        ride_id: Uuid,
        driver_id: Uuid,
    ) -> Result<Option<RideEntity>, sqlx::Error> {
        sqlx::query_as::<_, RideEntity>(
            r#"
            SELECT id, rider_id, driver_id, pickup_lat, pickup_lng,
                   dest_lat, dest_lng, tier, status, payment_method,
                   surge_multiplier::float8 AS surge_multiplier,
                   idempotency_key, created_at, updated_at
            FROM rides
            WHERE id = $1 AND driver_id = $2 AND status = 'MATCHED'
            FOR UPDATE
            "#,
        )
        .bind(ride_id)
        .bind(driver_id)
        .fetch_optional(&mut *conn)
        .await
    }

    /// Assign a driver to a locked ride and mark it MATCHED.
    /// Transaction-scoped; the caller holds both row locks.
    pub async fn assign_driver(
        &self,
        conn: &mut PgConnection,
        ride_id: Uuid,
        driver_id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE rides
            SET status = 'MATCHED', driver_id = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(ride_id)
        .bind(driver_id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    /// Conditional lifecycle transition: flips `from` → `to` atomically and
    /// reports whether the row was actually in `from`.
    ///
    /// The status predicate is what makes concurrent transitions linearizable
    /// per ride; a false return maps to CONFLICT upstream.
    pub async fn transition<'e, E>(
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
            UPDATE rides
            SET status = $3, updated_at = NOW()
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

    /// Pool-level convenience for transitions that mutate nothing else.
    pub async fn transition_status(
        &self,
        id: Uuid,
        from: &str,
        to: &str,
    ) -> Result<bool, sqlx::Error> {
        self.transition(&self.pool, id, from, to).await
    }
}
