//! Trip entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the trips table.
///
/// Fare columns are NUMERIC(10,2) (distance NUMERIC(10,3)) and are read back
/// through `::float8` casts; they stay NULL until the trip ends.
#[derive(Debug, Clone, FromRow)]
pub struct TripEntity {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub rider_id: Uuid,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub distance_km: Option<f64>,
    pub base_fare: Option<f64>,
    pub surge_fare: Option<f64>,
    pub total_fare: Option<f64>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TripEntity {
    /// Convert to domain model.
    pub fn into_domain(self) -> domain::models::Trip {
        use domain::models::TripStatus;

        let status = self.status.parse::<TripStatus>().unwrap_or(TripStatus::Active);

        domain::models::Trip {
            id: self.id,
            ride_id: self.ride_id,
            driver_id: self.driver_id,
            rider_id: self.rider_id,
            started_at: self.started_at,
            ended_at: self.ended_at,
            distance_km: self.distance_km,
            base_fare: self.base_fare,
            surge_fare: self.surge_fare,
            total_fare: self.total_fare,
            status,
            created_at: self.created_at,
        }
    }
}

impl From<TripEntity> for domain::models::Trip {
    fn from(entity: TripEntity) -> Self {
        entity.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::TripStatus;

    #[test]
    fn test_into_domain_pre_settlement() {
        let entity = TripEntity {
            id: Uuid::new_v4(),
            ride_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            rider_id: Uuid::new_v4(),
            started_at: Some(Utc::now()),
            ended_at: None,
            distance_km: None,
            base_fare: None,
            surge_fare: None,
            total_fare: None,
            status: "ACTIVE".to_string(),
            created_at: Utc::now(),
        };
        let trip = entity.into_domain();
        assert_eq!(trip.status, TripStatus::Active);
        assert!(trip.total_fare.is_none());
    }
}
