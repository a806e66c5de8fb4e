//! Tier-partitioned geospatial index of available drivers.
//!
//! One ordered map per service tier; a driver lives in at most one partition.
//! Entries expire [`keys::GEO_ENTRY_TTL`] after the last ping — a driver that
//! has stopped pinging is implicitly unroutable. Only drivers whose durable
//! status is `available` belong here; the location pipeline inserts and the
//! matching/lifecycle transitions remove.

use std::collections::{BTreeMap, HashMap};

use domain::models::ServiceTier;
use shared::geo::haversine_km;
use tokio::sync::RwLock;
use tokio::time::Instant;
use uuid::Uuid;

use crate::keys::GEO_ENTRY_TTL;

#[derive(Debug, Clone, Copy)]
struct GeoEntry {
    lat: f64,
    lng: f64,
    updated_at: Instant,
}

impl GeoEntry {
    fn is_stale(&self, now: Instant) -> bool {
        now.duration_since(self.updated_at) >= GEO_ENTRY_TTL
    }
}

/// A candidate returned by a radius search, ascending by distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyDriver {
    pub driver_id: Uuid,
    pub distance_km: f64,
}

/// In-process geo index, partitioned by tier.
#[derive(Debug, Default)]
pub struct GeoIndex {
    partitions: RwLock<HashMap<ServiceTier, BTreeMap<Uuid, GeoEntry>>>,
}

impl GeoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a driver's position in the tier partition.
    ///
    /// Upholds the one-partition invariant: a driver re-registered under a
    /// different tier disappears from its old partition.
    pub async fn upsert(&self, tier: ServiceTier, driver_id: Uuid, lat: f64, lng: f64) {
        let mut partitions = self.partitions.write().await;
        for (other, partition) in partitions.iter_mut() {
            if *other != tier {
                partition.remove(&driver_id);
            }
        }
        partitions.entry(tier).or_default().insert(
            driver_id,
            GeoEntry {
                lat,
                lng,
                updated_at: Instant::now(),
            },
        );
    }

    /// Up to `limit` fresh drivers within `radius_km` of the point, ordered
    /// by ascending distance.
    pub async fn nearby(
        &self,
        tier: ServiceTier,
        lat: f64,
        lng: f64,
        radius_km: f64,
        limit: usize,
    ) -> Vec<NearbyDriver> {
        let now = Instant::now();
        let partitions = self.partitions.read().await;
        let Some(partition) = partitions.get(&tier) else {
            return Vec::new();
        };

        let mut candidates: Vec<NearbyDriver> = partition
            .iter()
            .filter(|(_, entry)| !entry.is_stale(now))
            .map(|(driver_id, entry)| NearbyDriver {
                driver_id: *driver_id,
                distance_km: haversine_km(lat, lng, entry.lat, entry.lng),
            })
            .filter(|candidate| candidate.distance_km <= radius_km)
            .collect();

        candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        candidates.truncate(limit);
        candidates
    }

    /// Remove a driver from whichever partition holds it.
    pub async fn remove(&self, driver_id: Uuid) -> bool {
        let mut partitions = self.partitions.write().await;
        let mut removed = false;
        for partition in partitions.values_mut() {
            removed |= partition.remove(&driver_id).is_some();
        }
        removed
    }

    /// Fresh cardinality of a tier partition; the surge engine's supply signal.
    pub async fn supply(&self, tier: ServiceTier) -> usize {
        let now = Instant::now();
        let partitions = self.partitions.read().await;
        partitions
            .get(&tier)
            .map(|partition| {
                partition
                    .values()
                    .filter(|entry| !entry.is_stale(now))
                    .count()
            })
            .unwrap_or(0)
    }

    /// Drop entries past the ping TTL; returns how many were removed.
    pub async fn purge_stale(&self) -> usize {
        let now = Instant::now();
        let mut partitions = self.partitions.write().await;
        let mut removed = 0;
        for partition in partitions.values_mut() {
            let before = partition.len();
            partition.retain(|_, entry| !entry.is_stale(now));
            removed += before - partition.len();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    const BLR: (f64, f64) = (12.9716, 77.5946);

    #[tokio::test]
    async fn test_nearby_orders_by_distance() {
        let geo = GeoIndex::new();
        let near = Uuid::new_v4();
        let mid = Uuid::new_v4();
        let far = Uuid::new_v4();

        geo.upsert(ServiceTier::Standard, far, 13.01, 77.60).await;
        geo.upsert(ServiceTier::Standard, near, 12.9717, 77.5947).await;
        geo.upsert(ServiceTier::Standard, mid, 12.99, 77.60).await;

        let found = geo.nearby(ServiceTier::Standard, BLR.0, BLR.1, 10.0, 15).await;
        let ids: Vec<Uuid> = found.iter().map(|c| c.driver_id).collect();
        assert_eq!(ids, vec![near, mid, far]);
        assert!(found.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[tokio::test]
    async fn test_radius_and_limit() {
        let geo = GeoIndex::new();
        let close = Uuid::new_v4();
        let distant = Uuid::new_v4();
        geo.upsert(ServiceTier::Standard, close, 12.9717, 77.5947).await;
        // Chennai is ~290 km out, well past any matching radius.
        geo.upsert(ServiceTier::Standard, distant, 13.0827, 80.2707).await;

        let found = geo.nearby(ServiceTier::Standard, BLR.0, BLR.1, 5.0, 15).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].driver_id, close);

        for _ in 0..20 {
            geo.upsert(ServiceTier::Standard, Uuid::new_v4(), 12.9718, 77.5948)
                .await;
        }
        let capped = geo.nearby(ServiceTier::Standard, BLR.0, BLR.1, 5.0, 15).await;
        assert_eq!(capped.len(), 15);
    }

    #[tokio::test]
    async fn test_partitions_are_tier_isolated() {
        let geo = GeoIndex::new();
        let premium = Uuid::new_v4();
        geo.upsert(ServiceTier::Premium, premium, BLR.0, BLR.1).await;

        assert!(geo
            .nearby(ServiceTier::Standard, BLR.0, BLR.1, 5.0, 15)
            .await
            .is_empty());
        assert_eq!(geo.supply(ServiceTier::Premium).await, 1);
        assert_eq!(geo.supply(ServiceTier::Standard).await, 0);
    }

    #[tokio::test]
    async fn test_driver_lives_in_one_partition() {
        let geo = GeoIndex::new();
        let driver = Uuid::new_v4();
        geo.upsert(ServiceTier::Standard, driver, BLR.0, BLR.1).await;
        geo.upsert(ServiceTier::Xl, driver, BLR.0, BLR.1).await;

        assert_eq!(geo.supply(ServiceTier::Standard).await, 0);
        assert_eq!(geo.supply(ServiceTier::Xl).await, 1);
    }

    #[tokio::test]
    async fn test_remove() {
        let geo = GeoIndex::new();
        let driver = Uuid::new_v4();
        geo.upsert(ServiceTier::Standard, driver, BLR.0, BLR.1).await;
        assert!(geo.remove(driver).await);
        assert!(!geo.remove(driver).await);
        assert_eq!(geo.supply(ServiceTier::Standard).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_ping_ttl() {
        let geo = GeoIndex::new();
        let silent = Uuid::new_v4();
        let chatty = Uuid::new_v4();
        geo.upsert(ServiceTier::Standard, silent, BLR.0, BLR.1).await;
        geo.upsert(ServiceTier::Standard, chatty, BLR.0, BLR.1).await;

        tokio::time::advance(Duration::from_secs(20)).await;
        geo.upsert(ServiceTier::Standard, chatty, BLR.0, BLR.1).await;
        tokio::time::advance(Duration::from_secs(11)).await;

        // `silent` last pinged 31 s ago and is unroutable; `chatty` refreshed.
        let found = geo.nearby(ServiceTier::Standard, BLR.0, BLR.1, 5.0, 15).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].driver_id, chatty);
        assert_eq!(geo.supply(ServiceTier::Standard).await, 1);

        assert_eq!(geo.purge_stale().await, 1);
    }
}
