//! Fare calculation and the surge multiplier mapping.
//!
//! Pure functions; everything stateful (demand counters, supply cardinality)
//! lives in the surge engine that calls into here.

use serde::{Deserialize, Serialize};
use shared::money::round2;

use crate::models::driver::ServiceTier;
use crate::models::ride::EstimatedFare;

/// Per-tier rate constants (INR).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierRates {
    pub base_fee: f64,
    pub per_km: f64,
}

/// Rate table. Unknown tiers are mapped to `Standard` before lookup
/// (see `ServiceTier::from_str` fallbacks at the persistence boundary).
pub fn rates(tier: ServiceTier) -> TierRates {
    match tier {
        ServiceTier::Standard => TierRates {
            base_fee: 30.0,
            per_km: 10.0,
        },
        ServiceTier::Premium => TierRates {
            base_fee: 60.0,
            per_km: 15.0,
        },
        ServiceTier::Xl => TierRates {
            base_fee: 80.0,
            per_km: 20.0,
        },
    }
}

/// A settled fare: `total = base + surge`, each rounded half-up to 2 dp.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FareBreakdown {
    pub base: f64,
    pub surge: f64,
    pub total: f64,
}

/// Compute the fare for a tier, distance, and captured surge multiplier.
///
/// The surge component is derived from the already-rounded base so that
/// `total == base + surge` holds exactly on the wire.
pub fn calculate_fare(tier: ServiceTier, distance_km: f64, surge_multiplier: f64) -> FareBreakdown {
    let TierRates { base_fee, per_km } = rates(tier);
    let base = round2(base_fee + per_km * distance_km);
    let surge = round2(base * (surge_multiplier - 1.0));
    FareBreakdown {
        base,
        surge,
        total: round2(base + surge),
    }
}

/// Estimated fare window returned at ride creation: ±10% around the total.
pub fn estimate_fare_range(
    tier: ServiceTier,
    distance_km: f64,
    surge_multiplier: f64,
) -> EstimatedFare {
    let total = calculate_fare(tier, distance_km, surge_multiplier).total;
    EstimatedFare {
        min: round2(total * 0.9),
        max: round2(total * 1.1),
        currency: CURRENCY.to_string(),
    }
}

/// Settlement currency for all fares.
pub const CURRENCY: &str = "INR";

/// Piecewise demand/supply ratio → surge multiplier mapping, capped at
/// `max_surge` and rounded to 2 decimals.
pub fn surge_multiplier(ratio: f64, max_surge: f64) -> f64 {
    let multiplier = if ratio < 0.5 {
        1.0
    } else if ratio < 1.0 {
        1.5
    } else if ratio < 2.0 {
        2.0
    } else if ratio < 3.0 {
        3.0
    } else {
        ratio.min(max_surge)
    };
    round2(multiplier)
}

/// Demand/supply ratio with zero supply treated as 1.
pub fn surge_ratio(demand: i64, supply: usize) -> f64 {
    demand.max(0) as f64 / (supply.max(1)) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_no_surge() {
        let fare = calculate_fare(ServiceTier::Standard, 10.0, 1.0);
        assert_eq!(fare.base, 130.0);
        assert_eq!(fare.surge, 0.0);
        assert_eq!(fare.total, 130.0);
    }

    #[test]
    fn test_standard_with_surge() {
        let fare = calculate_fare(ServiceTier::Standard, 10.0, 2.0);
        assert_eq!(fare.base, 130.0);
        assert_eq!(fare.surge, 130.0);
        assert_eq!(fare.total, 260.0);
    }

    #[test]
    fn test_premium_no_surge() {
        let fare = calculate_fare(ServiceTier::Premium, 5.0, 1.0);
        assert_eq!(fare.base, 135.0);
        assert_eq!(fare.total, 135.0);
    }

    #[test]
    fn test_xl_with_surge() {
        let fare = calculate_fare(ServiceTier::Xl, 20.0, 1.5);
        assert_eq!(fare.base, 480.0);
        assert_eq!(fare.surge, 240.0);
        assert_eq!(fare.total, 720.0);
    }

    #[test]
    fn test_zero_distance_is_base_fee() {
        for tier in ServiceTier::ALL {
            let fare = calculate_fare(tier, 0.0, 1.0);
            assert_eq!(fare.total, rates(tier).base_fee);
        }
    }

    #[test]
    fn test_total_is_base_plus_surge() {
        let fare = calculate_fare(ServiceTier::Standard, 7.333, 1.37);
        assert!((fare.total - (fare.base + fare.surge)).abs() < 1e-9);
    }

    #[test]
    fn test_fare_identity_against_rate_table() {
        let d = 290.44;
        let fare = calculate_fare(ServiceTier::Standard, d, 1.0);
        assert_eq!(fare.total, round2(30.0 + 10.0 * d));
    }

    #[test]
    fn test_estimate_range_brackets_total() {
        let fare = calculate_fare(ServiceTier::Standard, 10.0, 1.0);
        let range = estimate_fare_range(ServiceTier::Standard, 10.0, 1.0);
        assert!(range.min <= fare.total && fare.total <= range.max);
        assert!(range.min < range.max);
        assert_eq!(range.currency, "INR");
    }

    #[test]
    fn test_surge_mapping_bands() {
        assert_eq!(surge_multiplier(0.0, 5.0), 1.0);
        assert_eq!(surge_multiplier(0.49, 5.0), 1.0);
        assert_eq!(surge_multiplier(0.5, 5.0), 1.5);
        assert_eq!(surge_multiplier(0.99, 5.0), 1.5);
        assert_eq!(surge_multiplier(1.0, 5.0), 2.0);
        assert_eq!(surge_multiplier(1.99, 5.0), 2.0);
        assert_eq!(surge_multiplier(2.0, 5.0), 3.0);
        assert_eq!(surge_multiplier(2.99, 5.0), 3.0);
        assert_eq!(surge_multiplier(3.5, 5.0), 3.5);
    }

    #[test]
    fn test_surge_capped_for_arbitrarily_large_ratio() {
        assert_eq!(surge_multiplier(100.0, 5.0), 5.0);
        assert_eq!(surge_multiplier(1e9, 5.0), 5.0);
    }

    #[test]
    fn test_zero_supply_counts_as_one() {
        assert_eq!(surge_ratio(20, 0), 20.0);
        assert_eq!(surge_ratio(20, 5), 4.0);
        assert_eq!(surge_ratio(0, 0), 0.0);
    }

    #[test]
    fn test_negative_demand_clamped() {
        assert_eq!(surge_ratio(-3, 10), 0.0);
    }
}
