//! Trip domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// Trip Status Enum
// ============================================================================

/// State of a trip in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TripStatus {
    Active,
    Paused,
    Completed,
}

impl TripStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Active => "ACTIVE",
            TripStatus::Paused => "PAUSED",
            TripStatus::Completed => "COMPLETED",
        }
    }

    /// A trip can end only while it is running or paused.
    pub fn can_end(&self) -> bool {
        matches!(self, TripStatus::Active | TripStatus::Paused)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TripStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(TripStatus::Active),
            "PAUSED" => Ok(TripStatus::Paused),
            "COMPLETED" => Ok(TripStatus::Completed),
            _ => Err(format!(
                "Invalid trip status: {}. Must be one of: ACTIVE, PAUSED, COMPLETED",
                s
            )),
        }
    }
}

// ============================================================================
// Core Model
// ============================================================================

/// Represents a trip record, one-to-one with its ride.
///
/// Fare fields stay null until the trip ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub driver_id: Uuid,
    pub rider_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_fare: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surge_fare: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_fare: Option<f64>,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request payload for ending a trip at the drop-off point.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TripEndRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub final_lat: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub final_lng: f64,
}

/// Response payload with the settled fare breakdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripEndResponse {
    pub trip_id: Uuid,
    pub distance_km: f64,
    pub base_fare: f64,
    pub surge_fare: f64,
    pub total_fare: f64,
    pub currency: String,
    pub payment_status: super::RideStatus,
}

/// Response payload for trip start/pause/resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripStateResponse {
    pub trip_id: Uuid,
    pub trip_status: TripStatus,
    pub ride_status: super::RideStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_can_end() {
        assert!(TripStatus::Active.can_end());
        assert!(TripStatus::Paused.can_end());
        assert!(!TripStatus::Completed.can_end());
    }

    #[test]
    fn test_storage_round_trip() {
        for status in [TripStatus::Active, TripStatus::Paused, TripStatus::Completed] {
            assert_eq!(TripStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(TripStatus::from_str("active").is_err());
    }

    #[test]
    fn test_end_request_validation() {
        let ok = TripEndRequest {
            final_lat: 13.0827,
            final_lng: 80.2707,
        };
        assert!(ok.validate().is_ok());

        let bad = TripEndRequest {
            final_lat: 91.0,
            final_lng: 80.2707,
        };
        assert!(bad.validate().is_err());
    }
}
