//! Driver–rider matching engine.
//!
//! Flow per ride:
//!   1. Pull up to 5 × max_retries candidates from the geo index, nearest
//!      first, within the configured radius
//!   2. Lock the candidate with a set-if-absent cache entry (TTL-bounded so a
//!      crashed matcher cannot strand a driver)
//!   3. Re-read the driver row as ground truth
//!   4. Commit the assignment in one transaction: driver → on_trip,
//!      ride → MATCHED, trip inserted ACTIVE
//!   5. On any failure, release the lock and try the next candidate; when the
//!      pool is exhausted, cancel the ride
//!
//! At-most-once assignment rests on three fences: the cache lock (concurrent
//! matchers propose disjoint drivers), the SKIP LOCKED driver row predicate
//! (a taken driver reads as absent even if the cache lock was lost), and the
//! REQUESTED predicate on the ride row lock (the same ride cannot commit
//! twice).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use cache::{keys, CacheStore, GeoIndex};
use chrono::Utc;
use domain::models::{DriverStatus, RideStatus, ServiceTier};
use persistence::repositories::{DriverRepository, RideRepository, TripRepository};
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::MatchingConfig;
use crate::middleware::metrics::{record_matching_exhausted, record_ride_matched};
use crate::services::surge::SurgeEngine;

/// Outcome of one nested assignment transaction.
enum AssignOutcome {
    /// Commit succeeded; the ride is MATCHED.
    Assigned,
    /// The driver row was locked or no longer available; try the next one.
    DriverTaken,
    /// The ride is no longer REQUESTED; stop the run entirely.
    RideGone,
}

/// One matching task per ride; owns cloned handles so it can outlive the
/// request that spawned it.
pub struct MatchingEngine {
    pool: PgPool,
    cache: Arc<CacheStore>,
    geo: Arc<GeoIndex>,
    surge: Arc<SurgeEngine>,
    config: MatchingConfig,
}

impl MatchingEngine {
    pub fn new(
        pool: PgPool,
        cache: Arc<CacheStore>,
        geo: Arc<GeoIndex>,
        surge: Arc<SurgeEngine>,
        config: MatchingConfig,
    ) -> Self {
        Self {
            pool,
            cache,
            geo,
            surge,
            config,
        }
    }

    /// Attempt to find and assign a driver for the given ride.
    /// Returns true on success, false if the ride ended up cancelled or gone.
    pub async fn run(
        &self,
        ride_id: Uuid,
        pickup_lat: f64,
        pickup_lng: f64,
        tier: ServiceTier,
    ) -> bool {
        let candidates = self
            .geo
            .nearby(
                tier,
                pickup_lat,
                pickup_lng,
                self.config.radius_km,
                self.config.candidate_limit(),
            )
            .await;

        if candidates.is_empty() {
            warn!(ride_id = %ride_id, tier = %tier, "No candidates in radius");
            self.cancel_unmatched(ride_id, tier).await;
            return false;
        }

        let drivers = DriverRepository::new(self.pool.clone());
        let lock_ttl = Duration::from_secs(self.config.timeout_seconds);
        let lock_owner = ride_id.to_string();

        for candidate in &candidates {
            let driver_id = candidate.driver_id;
            let lock_key = keys::driver_lock(driver_id);

            if !self.cache.set_nx(&lock_key, &lock_owner, lock_ttl).await {
                continue; // driver locked by another matcher
            }

            // Ground truth: the index may lag the record store.
            let available = matches!(
                drivers.find_by_id(driver_id).await,
                Ok(Some(row)) if DriverStatus::from_str(&row.status) == Ok(DriverStatus::Available)
            );
            if !available {
                self.cache.delete_if(&lock_key, &lock_owner).await;
                continue;
            }

            match self.try_assign(ride_id, driver_id).await {
                Ok(AssignOutcome::Assigned) => {
                    info!(
                        ride_id = %ride_id,
                        driver_id = %driver_id,
                        distance_km = candidate.distance_km,
                        "Matched ride to driver"
                    );
                    self.after_assign(ride_id, driver_id, tier).await;
                    self.cache.delete_if(&lock_key, &lock_owner).await;
                    return true;
                }
                Ok(AssignOutcome::DriverTaken) => {
                    self.cache.delete_if(&lock_key, &lock_owner).await;
                    continue;
                }
                Ok(AssignOutcome::RideGone) => {
                    // Cancelled or claimed by a concurrent matcher; nothing
                    // to roll back, nothing further to do.
                    warn!(ride_id = %ride_id, "Ride no longer REQUESTED, aborting match");
                    self.cache.delete_if(&lock_key, &lock_owner).await;
                    return false;
                }
                Err(e) => {
                    error!(
                        ride_id = %ride_id,
                        driver_id = %driver_id,
                        error = %e,
                        "Assignment transaction failed"
                    );
                    self.cache.delete_if(&lock_key, &lock_owner).await;
                    continue;
                }
            }
        }

        self.cancel_unmatched(ride_id, tier).await;
        false
    }

    /// The nested assignment transaction of the matching algorithm.
    async fn try_assign(&self, ride_id: Uuid, driver_id: Uuid) -> Result<AssignOutcome, sqlx::Error> {
        let drivers = DriverRepository::new(self.pool.clone());
        let rides = RideRepository::new(self.pool.clone());
        let trips = TripRepository::new(self.pool.clone());

        let mut tx = self.pool.begin().await?;

        if drivers.lock_available(&mut tx, driver_id).await?.is_none() {
            tx.rollback().await?;
            return Ok(AssignOutcome::DriverTaken);
        }

        let Some(ride) = rides.lock_requested(&mut tx, ride_id).await? else {
            tx.rollback().await?;
            return Ok(AssignOutcome::RideGone);
        };

        drivers.mark_on_trip(&mut tx, driver_id).await?;
        rides.assign_driver(&mut tx, ride_id, driver_id).await?;
        trips
            .insert(&mut tx, ride_id, driver_id, ride.rider_id, Utc::now())
            .await?;

        tx.commit().await?;
        Ok(AssignOutcome::Assigned)
    }

    /// Post-commit bookkeeping for a successful assignment: the driver left
    /// the available pool and the ride left the demand pool.
    async fn after_assign(&self, ride_id: Uuid, driver_id: Uuid, tier: ServiceTier) {
        self.geo.remove(driver_id).await;
        self.cache.delete(&keys::driver_tier(driver_id)).await;
        self.cache.delete(&keys::ride_status(ride_id)).await;
        self.surge.decrement_demand(tier).await;
        record_ride_matched(tier.as_str());
    }

    /// Cancel a ride nobody could serve. The REQUESTED predicate makes this a
    /// no-op if a concurrent actor got there first.
    async fn cancel_unmatched(&self, ride_id: Uuid, tier: ServiceTier) {
        let rides = RideRepository::new(self.pool.clone());
        match rides
            .transition_status(
                ride_id,
                RideStatus::Requested.as_str(),
                RideStatus::Cancelled.as_str(),
            )
            .await
        {
            Ok(true) => {
                warn!(ride_id = %ride_id, "Ride cancelled (no driver found)");
                self.cache.delete(&keys::ride_status(ride_id)).await;
                self.surge.decrement_demand(tier).await;
                record_matching_exhausted(tier.as_str());
            }
            Ok(false) => {
                // Already matched or cancelled elsewhere; leave it alone.
            }
            Err(e) => {
                error!(ride_id = %ride_id, error = %e, "Failed to cancel unmatched ride");
            }
        }
    }
}
