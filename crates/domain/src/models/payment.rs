//! Payment domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// Payment Method Enum
// ============================================================================

/// How the rider pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Card,
    Wallet,
    Cash,
}

impl PaymentMethod {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Cash => "cash",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "wallet" => Ok(PaymentMethod::Wallet),
            "cash" => Ok(PaymentMethod::Cash),
            _ => Err(format!(
                "Invalid payment method: {}. Must be one of: card, wallet, cash",
                s
            )),
        }
    }
}

// ============================================================================
// Payment Status Enum
// ============================================================================

/// Settlement state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
    Refunded,
}

impl PaymentStatus {
    /// Returns the string representation for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    /// Check if transition to target status is valid.
    ///
    /// PENDING → SUCCESS | FAILED; FAILED → PENDING on retry;
    /// SUCCESS → REFUNDED through back-office tooling.
    pub fn can_transition_to(&self, target: PaymentStatus) -> bool {
        matches!(
            (self, target),
            (PaymentStatus::Pending, PaymentStatus::Success)
                | (PaymentStatus::Pending, PaymentStatus::Failed)
                | (PaymentStatus::Failed, PaymentStatus::Pending)
                | (PaymentStatus::Success, PaymentStatus::Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "SUCCESS" => Ok(PaymentStatus::Success),
            "FAILED" => Ok(PaymentStatus::Failed),
            "REFUNDED" => Ok(PaymentStatus::Refunded),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

// ============================================================================
// Core Model
// ============================================================================

/// Represents a payment record for a completed trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub rider_id: Uuid,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psp_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Request payload for settling a completed trip.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaymentRequest {
    pub trip_id: Uuid,

    pub payment_method: PaymentMethod,

    #[validate(custom(function = "shared::validation::validate_amount"))]
    pub amount: f64,
}

/// Response payload for a payment attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentResponse {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psp_ref: Option<String>,
    pub amount: f64,
    pub currency: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_pending_outcomes() {
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Success));
        assert!(PaymentStatus::Pending.can_transition_to(PaymentStatus::Failed));
    }

    #[test]
    fn test_failed_retries_to_pending() {
        assert!(PaymentStatus::Failed.can_transition_to(PaymentStatus::Pending));
    }

    #[test]
    fn test_refund_only_from_success() {
        assert!(PaymentStatus::Success.can_transition_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Pending.can_transition_to(PaymentStatus::Refunded));
        assert!(!PaymentStatus::Failed.can_transition_to(PaymentStatus::Refunded));
    }

    #[test]
    fn test_no_reverse_settlement() {
        assert!(!PaymentStatus::Success.can_transition_to(PaymentStatus::Pending));
        assert!(!PaymentStatus::Refunded.can_transition_to(PaymentStatus::Success));
    }

    #[test]
    fn test_storage_round_trip() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Success,
            PaymentStatus::Failed,
            PaymentStatus::Refunded,
        ] {
            assert_eq!(PaymentStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_payment_request_rejects_non_positive_amount() {
        let req = PaymentRequest {
            trip_id: Uuid::new_v4(),
            payment_method: PaymentMethod::Card,
            amount: 0.0,
        };
        assert!(req.validate().is_err());
    }
}
