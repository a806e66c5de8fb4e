//! Payment entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the payments table.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentEntity {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub rider_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    pub psp_ref: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentEntity {
    /// Convert to domain model.
    pub fn into_domain(self) -> domain::models::Payment {
        use domain::models::PaymentStatus;

        let status = self
            .status
            .parse::<PaymentStatus>()
            .unwrap_or(PaymentStatus::Pending);

        domain::models::Payment {
            id: self.id,
            trip_id: self.trip_id,
            rider_id: self.rider_id,
            amount: self.amount,
            currency: self.currency,
            status,
            psp_ref: self.psp_ref,
            idempotency_key: self.idempotency_key,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<PaymentEntity> for domain::models::Payment {
    fn from(entity: PaymentEntity) -> Self {
        entity.into_domain()
    }
}
