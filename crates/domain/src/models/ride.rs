//! Ride domain model and its lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

use super::driver::ServiceTier;
use super::payment::PaymentMethod;

// ============================================================================
// Ride Status State Machine
// ============================================================================

/// Lifecycle state of a ride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Requested,
    Matched,
    DriverEnRoute,
    TripStarted,
    TripPaused,
    TripEnded,
    PaymentPending,
    Completed,
    Cancelled,
    PaymentFailed,
}

/// Static transition table: (current, next) pairs that are permitted.
/// Any pair not listed is rejected.
const TRANSITIONS: &[(RideStatus, RideStatus)] = &[
    (RideStatus::Requested, RideStatus::Matched),
    (RideStatus::Requested, RideStatus::Cancelled),
    (RideStatus::Matched, RideStatus::DriverEnRoute),
    (RideStatus::Matched, RideStatus::Cancelled),
    (RideStatus::DriverEnRoute, RideStatus::TripStarted),
    (RideStatus::DriverEnRoute, RideStatus::Cancelled),
    (RideStatus::TripStarted, RideStatus::TripPaused),
    (RideStatus::TripStarted, RideStatus::TripEnded),
    (RideStatus::TripPaused, RideStatus::TripStarted),
    (RideStatus::TripEnded, RideStatus::PaymentPending),
    (RideStatus::PaymentPending, RideStatus::Completed),
    (RideStatus::PaymentPending, RideStatus::PaymentFailed),
    (RideStatus::PaymentFailed, RideStatus::PaymentPending),
];

impl RideStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Requested => "REQUESTED",
            RideStatus::Matched => "MATCHED",
            RideStatus::DriverEnRoute => "DRIVER_EN_ROUTE",
            RideStatus::TripStarted => "TRIP_STARTED",
            RideStatus::TripPaused => "TRIP_PAUSED",
            RideStatus::TripEnded => "TRIP_ENDED",
            RideStatus::PaymentPending => "PAYMENT_PENDING",
            RideStatus::Completed => "COMPLETED",
            RideStatus::Cancelled => "CANCELLED",
            RideStatus::PaymentFailed => "PAYMENT_FAILED",
        }
    }

    /// Check if transition to target state is permitted.
    pub fn can_transition_to(&self, target: RideStatus) -> bool {
        TRANSITIONS.contains(&(*self, target))
    }

    /// A state with no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        TRANSITIONS.iter().all(|(from, _)| from != self)
    }

    /// States from which a rider-initiated cancellation is still allowed
    /// (pre-trip only; once the trip has started, cancellation is closed).
    pub fn is_cancellable(&self) -> bool {
        self.can_transition_to(RideStatus::Cancelled)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RideStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUESTED" => Ok(RideStatus::Requested),
            "MATCHED" => Ok(RideStatus::Matched),
            "DRIVER_EN_ROUTE" => Ok(RideStatus::DriverEnRoute),
            "TRIP_STARTED" => Ok(RideStatus::TripStarted),
            "TRIP_PAUSED" => Ok(RideStatus::TripPaused),
            "TRIP_ENDED" => Ok(RideStatus::TripEnded),
            "PAYMENT_PENDING" => Ok(RideStatus::PaymentPending),
            "COMPLETED" => Ok(RideStatus::Completed),
            "CANCELLED" => Ok(RideStatus::Cancelled),
            "PAYMENT_FAILED" => Ok(RideStatus::PaymentFailed),
            _ => Err(format!("Invalid ride status: {}", s)),
        }
    }
}

// ============================================================================
// Core Model
// ============================================================================

/// Represents a ride record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ride {
    pub id: Uuid,
    pub rider_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<Uuid>,
    pub pickup_lat: f64,
    pub pickup_lng: f64,
    pub dest_lat: f64,
    pub dest_lng: f64,
    pub tier: ServiceTier,
    pub status: RideStatus,
    pub payment_method: PaymentMethod,
    pub surge_multiplier: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request payload for creating a ride.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRideRequest {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub pickup_lat: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub pickup_lng: f64,

    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub dest_lat: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub dest_lng: f64,

    #[serde(default = "default_tier")]
    pub tier: ServiceTier,

    pub payment_method: PaymentMethod,
}

fn default_tier() -> ServiceTier {
    ServiceTier::Standard
}

/// Estimated fare window returned at ride creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EstimatedFare {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

/// Response payload for a created ride.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRideResponse {
    pub id: Uuid,
    pub status: RideStatus,
    pub surge_multiplier: f64,
    pub estimated_fare: EstimatedFare,
    pub created_at: DateTime<Utc>,
}

/// Minimal driver details embedded in a ride status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverBrief {
    pub id: Uuid,
    pub name: String,
    pub phone: String,
}

/// Response payload for a ride status lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RideStatusResponse {
    pub id: Uuid,
    pub status: RideStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<DriverBrief>,
    pub surge_multiplier: f64,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_requested_to_matched() {
        assert!(RideStatus::Requested.can_transition_to(RideStatus::Matched));
    }

    #[test]
    fn test_requested_to_cancelled() {
        assert!(RideStatus::Requested.can_transition_to(RideStatus::Cancelled));
    }

    #[test]
    fn test_matched_to_driver_en_route() {
        assert!(RideStatus::Matched.can_transition_to(RideStatus::DriverEnRoute));
    }

    #[test]
    fn test_driver_en_route_to_trip_started() {
        assert!(RideStatus::DriverEnRoute.can_transition_to(RideStatus::TripStarted));
    }

    #[test]
    fn test_trip_pause_resume_cycle() {
        assert!(RideStatus::TripStarted.can_transition_to(RideStatus::TripPaused));
        assert!(RideStatus::TripPaused.can_transition_to(RideStatus::TripStarted));
        assert!(!RideStatus::TripPaused.can_transition_to(RideStatus::TripEnded));
    }

    #[test]
    fn test_trip_ended_to_payment_pending() {
        assert!(RideStatus::TripEnded.can_transition_to(RideStatus::PaymentPending));
    }

    #[test]
    fn test_payment_pending_outcomes() {
        assert!(RideStatus::PaymentPending.can_transition_to(RideStatus::Completed));
        assert!(RideStatus::PaymentPending.can_transition_to(RideStatus::PaymentFailed));
    }

    #[test]
    fn test_payment_failed_can_retry() {
        assert!(RideStatus::PaymentFailed.can_transition_to(RideStatus::PaymentPending));
    }

    #[test]
    fn test_terminal_states() {
        assert!(RideStatus::Completed.is_terminal());
        assert!(RideStatus::Cancelled.is_terminal());
        assert!(!RideStatus::PaymentFailed.is_terminal());
        assert!(!RideStatus::Requested.is_terminal());
    }

    #[test]
    fn test_no_backward_jumps() {
        assert!(!RideStatus::Completed.can_transition_to(RideStatus::Requested));
        assert!(!RideStatus::Cancelled.can_transition_to(RideStatus::Requested));
        assert!(!RideStatus::TripStarted.can_transition_to(RideStatus::Requested));
        assert!(!RideStatus::Matched.can_transition_to(RideStatus::Requested));
    }

    #[test]
    fn test_cancellation_window_closes_at_trip_start() {
        assert!(RideStatus::Requested.is_cancellable());
        assert!(RideStatus::Matched.is_cancellable());
        assert!(RideStatus::DriverEnRoute.is_cancellable());
        assert!(!RideStatus::TripStarted.is_cancellable());
        assert!(!RideStatus::PaymentPending.is_cancellable());
    }

    #[test]
    fn test_every_status_reachable_from_requested() {
        // Breadth-first walk of the transition table.
        let mut reachable = vec![RideStatus::Requested];
        let mut frontier = vec![RideStatus::Requested];
        while let Some(state) = frontier.pop() {
            for (from, to) in super::TRANSITIONS {
                if *from == state && !reachable.contains(to) {
                    reachable.push(*to);
                    frontier.push(*to);
                }
            }
        }
        for status in [
            RideStatus::Matched,
            RideStatus::DriverEnRoute,
            RideStatus::TripStarted,
            RideStatus::TripPaused,
            RideStatus::TripEnded,
            RideStatus::PaymentPending,
            RideStatus::Completed,
            RideStatus::Cancelled,
            RideStatus::PaymentFailed,
        ] {
            assert!(reachable.contains(&status), "{status} unreachable");
        }
    }

    #[test]
    fn test_storage_round_trip() {
        for status in [
            RideStatus::Requested,
            RideStatus::DriverEnRoute,
            RideStatus::PaymentFailed,
        ] {
            assert_eq!(RideStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(RideStatus::from_str("UNKNOWN").is_err());
    }

    #[test]
    fn test_status_serde_screaming_snake() {
        assert_eq!(
            serde_json::to_string(&RideStatus::DriverEnRoute).unwrap(),
            "\"DRIVER_EN_ROUTE\""
        );
    }
}
