//! Surge pricing engine.
//!
//! Demand is a per-tier counter in the cache store, incremented at ride
//! creation and decremented on match/cancel, with a TTL floor so a stuck
//! counter cannot pin surge forever. Supply is the fresh cardinality of the
//! tier's geo partition. The mapping from ratio to multiplier is the pure
//! function in `domain::services::pricing`.

use std::sync::Arc;

use cache::{keys, CacheStore, GeoIndex};
use domain::models::ServiceTier;
use domain::services::pricing;
use tracing::debug;

/// Per-tier demand/supply → multiplier computation.
pub struct SurgeEngine {
    cache: Arc<CacheStore>,
    geo: Arc<GeoIndex>,
    max_multiplier: f64,
}

impl SurgeEngine {
    pub fn new(cache: Arc<CacheStore>, geo: Arc<GeoIndex>, max_multiplier: f64) -> Self {
        Self {
            cache,
            geo,
            max_multiplier,
        }
    }

    /// Current multiplier for a tier, rounded to 2 decimals and capped.
    pub async fn compute(&self, tier: ServiceTier) -> f64 {
        let demand = self.cache.counter(&keys::surge_demand(tier)).await;
        let supply = self.geo.supply(tier).await;
        let multiplier =
            pricing::surge_multiplier(pricing::surge_ratio(demand, supply), self.max_multiplier);

        debug!(
            tier = %tier,
            demand,
            supply,
            multiplier,
            "Computed surge multiplier"
        );
        multiplier
    }

    /// Call when a new ride is requested.
    pub async fn increment_demand(&self, tier: ServiceTier) {
        self.cache
            .incr(&keys::surge_demand(tier), keys::SURGE_DEMAND_TTL)
            .await;
    }

    /// Call when a ride is matched, cancelled, or timed out.
    pub async fn decrement_demand(&self, tier: ServiceTier) {
        self.cache.decr_floor(&keys::surge_demand(tier)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    const BLR: (f64, f64) = (12.9716, 77.5946);

    fn engine() -> SurgeEngine {
        SurgeEngine::new(Arc::new(CacheStore::new()), Arc::new(GeoIndex::new()), 5.0)
    }

    async fn add_supply(engine: &SurgeEngine, tier: ServiceTier, count: usize) {
        for _ in 0..count {
            engine
                .geo
                .upsert(tier, Uuid::new_v4(), BLR.0, BLR.1)
                .await;
        }
    }

    #[tokio::test]
    async fn test_no_demand_returns_base_multiplier() {
        let engine = engine();
        add_supply(&engine, ServiceTier::Standard, 10).await;
        assert_eq!(engine.compute(ServiceTier::Standard).await, 1.0);
    }

    #[tokio::test]
    async fn test_high_demand_maps_to_surge_band() {
        let engine = engine();
        add_supply(&engine, ServiceTier::Standard, 5).await;
        for _ in 0..20 {
            engine.increment_demand(ServiceTier::Standard).await;
        }
        // ratio = 20 / 5 = 4 → capped linear band
        assert_eq!(engine.compute(ServiceTier::Standard).await, 4.0);
    }

    #[tokio::test]
    async fn test_surge_capped_at_max() {
        let engine = engine();
        add_supply(&engine, ServiceTier::Standard, 1).await;
        for _ in 0..100 {
            engine.increment_demand(ServiceTier::Standard).await;
        }
        assert_eq!(engine.compute(ServiceTier::Standard).await, 5.0);
    }

    #[tokio::test]
    async fn test_zero_supply_treated_as_one() {
        let engine = engine();
        for _ in 0..2 {
            engine.increment_demand(ServiceTier::Standard).await;
        }
        // ratio = 2 / max(0, 1) = 2 → 3.0 band
        assert_eq!(engine.compute(ServiceTier::Standard).await, 3.0);
    }

    #[tokio::test]
    async fn test_demand_is_per_tier() {
        let engine = engine();
        add_supply(&engine, ServiceTier::Standard, 1).await;
        add_supply(&engine, ServiceTier::Premium, 1).await;
        for _ in 0..4 {
            engine.increment_demand(ServiceTier::Premium).await;
        }
        assert_eq!(engine.compute(ServiceTier::Standard).await, 1.0);
        assert_eq!(engine.compute(ServiceTier::Premium).await, 4.0);
    }

    #[tokio::test]
    async fn test_decrement_restores_base() {
        let engine = engine();
        add_supply(&engine, ServiceTier::Standard, 2).await;
        engine.increment_demand(ServiceTier::Standard).await;
        engine.increment_demand(ServiceTier::Standard).await;
        // ratio 1.0 → 2.0
        assert_eq!(engine.compute(ServiceTier::Standard).await, 2.0);

        engine.decrement_demand(ServiceTier::Standard).await;
        engine.decrement_demand(ServiceTier::Standard).await;
        assert_eq!(engine.compute(ServiceTier::Standard).await, 1.0);
        // Symmetric decrements never underflow.
        engine.decrement_demand(ServiceTier::Standard).await;
        assert_eq!(engine.compute(ServiceTier::Standard).await, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_counter_expires() {
        let engine = engine();
        add_supply(&engine, ServiceTier::Standard, 1).await;
        for _ in 0..10 {
            engine.increment_demand(ServiceTier::Standard).await;
        }
        assert!(engine.compute(ServiceTier::Standard).await > 1.0);

        // A crashed decrement path leaves the counter to die by TTL. The geo
        // entries go stale too, so supply collapses to the floor of 1.
        tokio::time::advance(std::time::Duration::from_secs(121)).await;
        assert_eq!(engine.compute(ServiceTier::Standard).await, 1.0);
    }
}
