//! Cache keyspace and TTL constants.
//!
//! Key shapes are shared between the location pipeline, the matching engine,
//! the surge engine, and the API layer; building them in one place keeps the
//! keyspace greppable.

use domain::models::ServiceTier;
use std::time::Duration;
use uuid::Uuid;

/// Last-known position of a driver.
pub const DRIVER_LOC_TTL: Duration = Duration::from_secs(30);
/// Driver tier lookaside to keep the ping fast path off the record store.
pub const DRIVER_TIER_TTL: Duration = Duration::from_secs(300);
/// Surge demand counter safety floor against stuck counters.
pub const SURGE_DEMAND_TTL: Duration = Duration::from_secs(120);
/// Ride status read-through cache.
pub const RIDE_STATUS_TTL: Duration = Duration::from_secs(60);
/// Replay-safe idempotency response cache.
pub const IDEMPOTENCY_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// Geo index entries go unroutable this long after the last ping.
pub const GEO_ENTRY_TTL: Duration = Duration::from_secs(30);

pub fn driver_loc(driver_id: Uuid) -> String {
    format!("driver:{driver_id}:loc")
}

pub fn driver_tier(driver_id: Uuid) -> String {
    format!("driver:{driver_id}:tier")
}

pub fn driver_lock(driver_id: Uuid) -> String {
    format!("driver:{driver_id}:lock")
}

pub fn surge_demand(tier: ServiceTier) -> String {
    format!("surge:demand:{tier}")
}

pub fn ride_status(ride_id: Uuid) -> String {
    format!("ride:{ride_id}:status")
}

pub fn idempotency(key: &str) -> String {
    format!("idempotency:{key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_shapes() {
        let id = Uuid::nil();
        assert_eq!(
            driver_lock(id),
            "driver:00000000-0000-0000-0000-000000000000:lock"
        );
        assert_eq!(surge_demand(ServiceTier::Xl), "surge:demand:xl");
        assert_eq!(idempotency("abc"), "idempotency:abc");
    }
}
