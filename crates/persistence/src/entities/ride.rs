//! Ride entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the rides table.
///
/// Note: `surge_multiplier` is NUMERIC(4,2) in the schema and is read back
/// through a `::float8` cast in every query.
#[derive(Debug, Clone, FromRow)]
pub struct RideEntity {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dest_lat: f64,
    pub dest_lng: f64,
    pub tier: String,
    pub status: String,
    pub payment_method: String,
    pub surge_multiplier: f64,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RideEntity {
    /// Convert to domain model.
    pub fn into_domain(self) -> domain::models::Ride {
        use domain::models::{PaymentMethod, RideStatus, ServiceTier};

        let tier = self.tier.parse::<ServiceTier>().unwrap_or(ServiceTier::Standard);
        let status = self
            .status
            .parse::<RideStatus>()
            .unwrap_or(RideStatus::Requested);
        let payment_method = self
            .payment_method
            .parse::<PaymentMethod>()
            .unwrap_or(PaymentMethod::Cash);

        domain::models::Ride {
            id: self.id,
            rider_id: self.rider_id,
            driver_id: self.driver_id,
            pickup_lat: self.pickup_lat,
            pickup_lng: self.pickup_lng,
            dest_lat: self.dest_lat,
            dest_lng: self.dest_lng,
            tier,
            status,
            payment_method,
            surge_multiplier: self.surge_multiplier,
            idempotency_key: self.idempotency_key,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<RideEntity> for domain::models::Ride {
    fn from(entity: RideEntity) -> Self {
        entity.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::RideStatus;

    #[test]
    fn test_into_domain() {
        let entity = RideEntity {
            id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            driver_id: None,
            pickup_lat: 12.9716,
            pickup_lng: 77.5946,
            dest_lat: 13.0827,
            dest_lng: 80.2707,
            tier: "standard".to_string(),
            status: "REQUESTED".to_string(),
            payment_method: "card".to_string(),
            surge_multiplier: 1.5,
            idempotency_key: Some("ride-key-1".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let ride = entity.into_domain();
        assert_eq!(ride.status, RideStatus::Requested);
        assert_eq!(ride.surge_multiplier, 1.5);
        assert!(ride.driver_id.is_none());
    }
}
