//! Driver entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the drivers table.
#[derive(Debug, Clone, FromRow)]
pub struct DriverEntity {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub tier: String,
    pub status: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub location_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DriverEntity {
    /// Convert to domain model. Unknown tier strings fall back to standard,
    /// unknown status strings to offline.
    pub fn into_domain(self) -> domain::models::Driver {
        use domain::models::{DriverStatus, ServiceTier};

        let tier = self.tier.parse::<ServiceTier>().unwrap_or(ServiceTier::Standard);
        let status = self
            .status
            .parse::<DriverStatus>()
            .unwrap_or(DriverStatus::Offline);

        domain::models::Driver {
            id: self.id,
            name: self.name,
            phone: self.phone,
            tier,
            status,
            lat: self.lat,
            lng: self.lng,
            location_updated_at: self.location_updated_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<DriverEntity> for domain::models::Driver {
    fn from(entity: DriverEntity) -> Self {
        entity.into_domain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::{DriverStatus, ServiceTier};

    fn entity(tier: &str, status: &str) -> DriverEntity {
        DriverEntity {
            id: Uuid::new_v4(),
            name: "Asha Kumar".to_string(),
            phone: "9876543210".to_string(),
            tier: tier.to_string(),
            status: status.to_string(),
            lat: Some(12.9716),
            lng: Some(77.5946),
            location_updated_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_into_domain() {
        let driver = entity("premium", "available").into_domain();
        assert_eq!(driver.tier, ServiceTier::Premium);
        assert_eq!(driver.status, DriverStatus::Available);
    }

    #[test]
    fn test_unknown_tier_falls_back_to_standard() {
        let driver = entity("hoverboard", "available").into_domain();
        assert_eq!(driver.tier, ServiceTier::Standard);
    }

    #[test]
    fn test_unknown_status_falls_back_to_offline() {
        let driver = entity("standard", "???").into_domain();
        assert_eq!(driver.status, DriverStatus::Offline);
    }
}
