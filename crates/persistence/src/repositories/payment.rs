//! Payment repository for database operations.

use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::entities::PaymentEntity;

/// Repository for payment database operations.
#[derive(Clone)]
pub struct PaymentRepository {
    pool: PgPool,
}

impl PaymentRepository {
    /// Creates a new PaymentRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a PENDING payment for a settled trip. Transaction-scoped:
    /// commits with the trip/ride/driver updates of trip end.
    pub async fn insert_pending(
        &self,
        conn: &mut PgConnection,
        trip_id: Uuid,
        rider_id: Uuid,
        amount: f64,
        currency: &str,
    ) -> Result<PaymentEntity, sqlx::Error> {
        sqlx::query_as::<_, PaymentEntity>(
            r#"
            INSERT INTO payments (trip_id, rider_id, amount, currency, status)
            VALUES ($1, $2, $3::float8, $4, 'PENDING')
            RETURNING id, trip_id, rider_id, amount::float8 AS amount,
                      currency, status, psp_ref, idempotency_key,
                      created_at, updated_at
            "#,
        )
        .bind(trip_id)
        .bind(rider_id)
        .bind(amount)
        .bind(currency)
        .fetch_one(&mut *conn)
        .await
    }

    /// Find the payment for a trip (one payment per completed trip).
    pub async fn find_by_trip_id(
        &self,
        trip_id: Uuid,
    ) -> Result<Option<PaymentEntity>, sqlx::Error> {
        sqlx::query_as::<_, PaymentEntity>(
            r#"
            SELECT id, trip_id, rider_id, amount::float8 AS amount,
                   currency, status, psp_ref, idempotency_key,
                   created_at, updated_at
            FROM payments
            WHERE trip_id = $1
            "#,
        )
        .bind(trip_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Record the client idempotency token on the payment row
    /// (defence-in-depth against replay-cache loss).
    pub async fn set_idempotency_key(
        &self,
        id: Uuid,
        idempotency_key: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE payments
            SET idempotency_key = $2, updated_at = NOW()
            WHERE id = $1 AND idempotency_key IS NULL
            "#,
        )
        .bind(id)
        .bind(idempotency_key)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Reopen a FAILED payment for a retry attempt; false if it was not FAILED.
    pub async fn reopen(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'PENDING', updated_at = NOW()
            WHERE id = $1 AND status = 'FAILED'
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Settle a PENDING payment with the provider outcome. Transaction-scoped
    /// so it commits with the ride's COMPLETED/PAYMENT_FAILED flip.
    pub async fn settle(
        &self,
        conn: &mut PgConnection,
        id: Uuid,
        status: &str,
        psp_ref: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = $2, psp_ref = $3, updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(psp_ref)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
