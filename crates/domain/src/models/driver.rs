//! Driver domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// Service Tier Enum
// ============================================================================

/// Service class chosen by the rider and the driver's eligibility.
///
/// Partitions the geo index and selects the fare rate table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTier {
    Standard,
    Premium,
    Xl,
}

impl ServiceTier {
    /// Returns the string representation for database storage and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceTier::Standard => "standard",
            ServiceTier::Premium => "premium",
            ServiceTier::Xl => "xl",
        }
    }

    /// All tiers, in rate-table order.
    pub const ALL: [ServiceTier; 3] = [ServiceTier::Standard, ServiceTier::Premium, ServiceTier::Xl];
}

impl fmt::Display for ServiceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ServiceTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "standard" => Ok(ServiceTier::Standard),
            "premium" => Ok(ServiceTier::Premium),
            "xl" => Ok(ServiceTier::Xl),
            _ => Err(format!(
                "Invalid tier: {}. Must be one of: standard, premium, xl",
                s
            )),
        }
    }
}

// ============================================================================
// Driver Status Enum
// ============================================================================

/// Availability state of a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverStatus {
    Offline,
    Available,
    OnTrip,
}

impl DriverStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            DriverStatus::Offline => "offline",
            DriverStatus::Available => "available",
            DriverStatus::OnTrip => "on_trip",
        }
    }

    /// Check if transition to target status is valid.
    ///
    /// offline ↔ available → on_trip → available
    pub fn can_transition_to(&self, target: DriverStatus) -> bool {
        matches!(
            (self, target),
            (DriverStatus::Offline, DriverStatus::Available)
                | (DriverStatus::Available, DriverStatus::Offline)
                | (DriverStatus::Available, DriverStatus::OnTrip)
                | (DriverStatus::OnTrip, DriverStatus::Available)
        )
    }
}

impl fmt::Display for DriverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DriverStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "offline" => Ok(DriverStatus::Offline),
            "available" => Ok(DriverStatus::Available),
            "on_trip" => Ok(DriverStatus::OnTrip),
            _ => Err(format!(
                "Invalid driver status: {}. Must be one of: offline, available, on_trip",
                s
            )),
        }
    }
}

// ============================================================================
// Core Model
// ============================================================================

/// Represents a registered driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub tier: ServiceTier,
    pub status: DriverStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request payload for registering a driver.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterDriverRequest {
    #[validate(length(min = 2, max = 255, message = "name must be 2-255 characters"))]
    pub name: String,

    #[validate(custom(function = "shared::validation::validate_phone"))]
    pub phone: String,

    #[serde(default = "default_tier")]
    pub tier: ServiceTier,
}

fn default_tier() -> ServiceTier {
    ServiceTier::Standard
}

/// Response payload for a registered driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverResponse {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
    pub tier: ServiceTier,
    pub status: DriverStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Driver> for DriverResponse {
    fn from(driver: Driver) -> Self {
        Self {
            id: driver.id,
            name: driver.name,
            phone: driver.phone,
            tier: driver.tier,
            status: driver.status,
            created_at: driver.created_at,
        }
    }
}

/// Response payload for a driver status toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverStatusResponse {
    pub id: Uuid,
    pub status: DriverStatus,
}

/// Request payload for a location ping.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LocationUpdateRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub lat: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub lng: f64,

    pub timestamp: Option<DateTime<Utc>>,
}

/// Request payload for a driver accepting a ride offer.
#[derive(Debug, Clone, Deserialize)]
pub struct AcceptRideRequest {
    pub ride_id: Uuid,
}

/// Response payload after a driver accepts a ride.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptRideResponse {
    pub trip_id: Uuid,
    pub status: super::RideStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_tier_round_trip() {
        for tier in ServiceTier::ALL {
            assert_eq!(ServiceTier::from_str(tier.as_str()).unwrap(), tier);
        }
        assert!(ServiceTier::from_str("luxury").is_err());
    }

    #[test]
    fn test_status_transitions() {
        assert!(DriverStatus::Offline.can_transition_to(DriverStatus::Available));
        assert!(DriverStatus::Available.can_transition_to(DriverStatus::Offline));
        assert!(DriverStatus::Available.can_transition_to(DriverStatus::OnTrip));
        assert!(DriverStatus::OnTrip.can_transition_to(DriverStatus::Available));

        assert!(!DriverStatus::Offline.can_transition_to(DriverStatus::OnTrip));
        assert!(!DriverStatus::OnTrip.can_transition_to(DriverStatus::Offline));
    }

    #[test]
    fn test_register_request_validation() {
        let valid = RegisterDriverRequest {
            name: "Asha Kumar".to_string(),
            phone: "9876543210".to_string(),
            tier: ServiceTier::Standard,
        };
        assert!(valid.validate().is_ok());

        let short_name = RegisterDriverRequest {
            name: "A".to_string(),
            ..valid.clone()
        };
        assert!(short_name.validate().is_err());

        let bad_phone = RegisterDriverRequest {
            phone: "12345".to_string(),
            ..valid
        };
        assert!(bad_phone.validate().is_err());
    }

    #[test]
    fn test_register_accepts_generated_identities() {
        use fake::faker::name::en::Name;
        use fake::faker::phone_number::en::PhoneNumber;
        use fake::Fake;

        for _ in 0..5 {
            let request = RegisterDriverRequest {
                name: Name().fake(),
                phone: "9876543210".to_string(),
                tier: ServiceTier::Premium,
            };
            assert!(request.validate().is_ok(), "{:?}", request.name);
            // Formatted numbers with separators must be rejected outright.
            let formatted: String = PhoneNumber().fake();
            if formatted.contains(['-', ' ', '(', ')', '.']) {
                let bad = RegisterDriverRequest {
                    phone: formatted,
                    ..request
                };
                assert!(bad.validate().is_err());
            }
        }
    }

    #[test]
    fn test_tier_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&ServiceTier::Xl).unwrap(),
            "\"xl\""
        );
        let tier: ServiceTier = serde_json::from_str("\"premium\"").unwrap();
        assert_eq!(tier, ServiceTier::Premium);
    }
}
