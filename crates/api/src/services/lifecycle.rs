//! Ride lifecycle controller.
//!
//! Every user-visible transition goes through here: the status predicate on
//! the UPDATE (or the row lock) encodes the required source state, the
//! related driver/trip/payment mutation commits in the same transaction, and
//! the ride status cache is invalidated after commit. A transition attempted
//! from the wrong state surfaces as CONFLICT with no effect.

use std::str::FromStr;
use std::sync::Arc;

use cache::{keys, CacheStore, GeoIndex};
use chrono::Utc;
use domain::models::driver::AcceptRideResponse;
use domain::models::trip::{TripEndResponse, TripStateResponse};
use domain::models::{RideStatus, ServiceTier, TripStatus};
use domain::services::pricing::{self, CURRENCY};
use persistence::entities::TripEntity;
use persistence::repositories::{
    DriverRepository, PaymentRepository, RideRepository, TripRepository,
};
use shared::geo::haversine_km;
use shared::money::round3;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::error::ApiError;

/// Lifecycle transitions spanning the record store and the caches.
pub struct LifecycleController {
    pool: PgPool,
    cache: Arc<CacheStore>,
    geo: Arc<GeoIndex>,
}

impl LifecycleController {
    pub fn new(pool: PgPool, cache: Arc<CacheStore>, geo: Arc<GeoIndex>) -> Self {
        Self { pool, cache, geo }
    }

    /// Driver accepts a MATCHED ride: → DRIVER_EN_ROUTE.
    ///
    /// The authenticated driver must be the assigned driver; the row lock
    /// predicate enforces both that and the source state.
    pub async fn accept_ride(
        &self,
        driver_id: Uuid,
        ride_id: Uuid,
    ) -> Result<AcceptRideResponse, ApiError> {
        let rides = RideRepository::new(self.pool.clone());
        let trips = TripRepository::new(self.pool.clone());

        let mut tx = self.pool.begin().await?;

        let ride = rides
            .lock_matched_for_driver(&mut tx, ride_id, driver_id)
            .await?
            .ok_or_else(|| {
                ApiError::Conflict("Ride not found, not yours, or already processed".to_string())
            })?;

        rides
            .transition(
                &mut *tx,
                ride_id,
                RideStatus::Matched.as_str(),
                RideStatus::DriverEnRoute.as_str(),
            )
            .await?;

        tx.commit().await?;

        let trip = trips
            .find_by_ride_id(ride_id)
            .await?
            .ok_or_else(|| ApiError::Internal("Trip record missing for matched ride".to_string()))?;

        self.cache.delete(&keys::ride_status(ride.id)).await;

        info!(ride_id = %ride_id, driver_id = %driver_id, "Driver accepted ride");
        Ok(AcceptRideResponse {
            trip_id: trip.id,
            status: RideStatus::DriverEnRoute,
        })
    }

    /// Rider picked up: DRIVER_EN_ROUTE → TRIP_STARTED.
    pub async fn start_trip(
        &self,
        trip_id: Uuid,
        driver_id: Uuid,
    ) -> Result<TripStateResponse, ApiError> {
        let trip = self.require_trip(trip_id, Some(driver_id)).await?;
        self.flip_ride(
            trip.ride_id,
            RideStatus::DriverEnRoute,
            RideStatus::TripStarted,
        )
        .await?;
        Ok(TripStateResponse {
            trip_id,
            trip_status: TripStatus::Active,
            ride_status: RideStatus::TripStarted,
        })
    }

    /// TRIP_STARTED → TRIP_PAUSED, flipping the trip row in the same
    /// transaction.
    pub async fn pause_trip(
        &self,
        trip_id: Uuid,
        driver_id: Uuid,
    ) -> Result<TripStateResponse, ApiError> {
        self.flip_trip_and_ride(
            trip_id,
            driver_id,
            (TripStatus::Active, TripStatus::Paused),
            (RideStatus::TripStarted, RideStatus::TripPaused),
        )
        .await?;
        Ok(TripStateResponse {
            trip_id,
            trip_status: TripStatus::Paused,
            ride_status: RideStatus::TripPaused,
        })
    }

    /// TRIP_PAUSED → TRIP_STARTED.
    pub async fn resume_trip(
        &self,
        trip_id: Uuid,
        driver_id: Uuid,
    ) -> Result<TripStateResponse, ApiError> {
        self.flip_trip_and_ride(
            trip_id,
            driver_id,
            (TripStatus::Paused, TripStatus::Active),
            (RideStatus::TripPaused, RideStatus::TripStarted),
        )
        .await?;
        Ok(TripStateResponse {
            trip_id,
            trip_status: TripStatus::Active,
            ride_status: RideStatus::TripStarted,
        })
    }

    /// End a running trip at the drop-off point.
    ///
    /// One transaction settles everything: trip → COMPLETED with distance and
    /// fares, ride stepped through the table to PAYMENT_PENDING, driver
    /// released to available, and a PENDING payment inserted for the total.
    pub async fn end_trip(
        &self,
        trip_id: Uuid,
        driver_id: Uuid,
        final_lat: f64,
        final_lng: f64,
    ) -> Result<TripEndResponse, ApiError> {
        let trips = TripRepository::new(self.pool.clone());
        let rides = RideRepository::new(self.pool.clone());
        let drivers = DriverRepository::new(self.pool.clone());
        let payments = PaymentRepository::new(self.pool.clone());

        let trip = self.require_trip(trip_id, Some(driver_id)).await?;
        let trip_status = TripStatus::from_str(&trip.status).unwrap_or(TripStatus::Active);
        if !trip_status.can_end() {
            return Err(ApiError::Conflict(format!(
                "Trip is already {}",
                trip.status
            )));
        }

        let ride = rides
            .find_by_id(trip.ride_id)
            .await?
            .ok_or_else(|| ApiError::Internal("Associated ride not found".to_string()))?;
        let ride_status = RideStatus::from_str(&ride.status)
            .map_err(|e| ApiError::Internal(e))?;
        let tier = ServiceTier::from_str(&ride.tier).unwrap_or(ServiceTier::Standard);

        let distance_km = round3(haversine_km(
            ride.pickup_lat,
            ride.pickup_lng,
            final_lat,
            final_lng,
        ));
        let fare = pricing::calculate_fare(tier, distance_km, ride.surge_multiplier);

        let mut tx = self.pool.begin().await?;

        if !trips
            .complete(
                &mut tx,
                trip_id,
                Utc::now(),
                distance_km,
                fare.base,
                fare.surge,
                fare.total,
            )
            .await?
        {
            tx.rollback().await?;
            return Err(ApiError::Conflict("Trip already settled".to_string()));
        }

        // Walk the ride forward through the table. A driver who never
        // reported pickup still ends legally: each hop is table-checked.
        let chain: &[RideStatus] = match ride_status {
            RideStatus::DriverEnRoute => &[
                RideStatus::TripStarted,
                RideStatus::TripEnded,
                RideStatus::PaymentPending,
            ],
            RideStatus::TripStarted => {
                &[RideStatus::TripEnded, RideStatus::PaymentPending]
            }
            RideStatus::TripPaused => &[
                RideStatus::TripStarted,
                RideStatus::TripEnded,
                RideStatus::PaymentPending,
            ],
            _ => {
                tx.rollback().await?;
                return Err(ApiError::Conflict(format!(
                    "Ride in status {} cannot settle",
                    ride.status
                )));
            }
        };
        let mut current = ride_status;
        for next in chain {
            if !current.can_transition_to(*next) {
                tx.rollback().await?;
                return Err(ApiError::Conflict(format!(
                    "Ride cannot move {current} → {next}"
                )));
            }
            if !rides
                .transition(&mut *tx, ride.id, current.as_str(), next.as_str())
                .await?
            {
                tx.rollback().await?;
                return Err(ApiError::Conflict(
                    "Ride state changed concurrently".to_string(),
                ));
            }
            current = *next;
        }

        drivers.mark_available(&mut tx, trip.driver_id).await?;

        payments
            .insert_pending(&mut tx, trip_id, trip.rider_id, fare.total, CURRENCY)
            .await?;

        tx.commit().await?;

        // The driver rejoins the pool at the drop-off point; pings refresh it.
        self.geo
            .upsert(tier, trip.driver_id, final_lat, final_lng)
            .await;
        self.cache.delete(&keys::driver_tier(trip.driver_id)).await;
        self.cache.delete(&keys::ride_status(ride.id)).await;

        info!(
            trip_id = %trip_id,
            distance_km,
            total_fare = fare.total,
            "Trip ended"
        );
        Ok(TripEndResponse {
            trip_id,
            distance_km,
            base_fare: fare.base,
            surge_fare: fare.surge,
            total_fare: fare.total,
            currency: CURRENCY.to_string(),
            payment_status: RideStatus::PaymentPending,
        })
    }

    /// Look up a trip; when `acting_driver` is given, it must be the trip's
    /// driver (the authenticated subject, not just the URL path).
    async fn require_trip(
        &self,
        trip_id: Uuid,
        acting_driver: Option<Uuid>,
    ) -> Result<TripEntity, ApiError> {
        let trip = TripRepository::new(self.pool.clone())
            .find_by_id(trip_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Trip not found".to_string()))?;

        if let Some(driver_id) = acting_driver {
            if trip.driver_id != driver_id {
                return Err(ApiError::Conflict(
                    "Trip does not belong to this driver".to_string(),
                ));
            }
        }
        Ok(trip)
    }

    /// Single-row ride transition with cache invalidation.
    async fn flip_ride(
        &self,
        ride_id: Uuid,
        from: RideStatus,
        to: RideStatus,
    ) -> Result<(), ApiError> {
        let rides = RideRepository::new(self.pool.clone());
        if !rides
            .transition_status(ride_id, from.as_str(), to.as_str())
            .await?
        {
            return Err(ApiError::Conflict(format!("Ride is not {from}")));
        }
        self.cache.delete(&keys::ride_status(ride_id)).await;
        Ok(())
    }

    /// Trip-row and ride-row flips in one transaction (pause/resume).
    async fn flip_trip_and_ride(
        &self,
        trip_id: Uuid,
        driver_id: Uuid,
        (trip_from, trip_to): (TripStatus, TripStatus),
        (ride_from, ride_to): (RideStatus, RideStatus),
    ) -> Result<(), ApiError> {
        let trips = TripRepository::new(self.pool.clone());
        let rides = RideRepository::new(self.pool.clone());

        let trip = self.require_trip(trip_id, Some(driver_id)).await?;

        let mut tx = self.pool.begin().await?;
        if !trips
            .set_status(&mut *tx, trip_id, trip_from.as_str(), trip_to.as_str())
            .await?
        {
            tx.rollback().await?;
            return Err(ApiError::Conflict(format!("Trip is not {trip_from}")));
        }
        if !rides
            .transition(&mut *tx, trip.ride_id, ride_from.as_str(), ride_to.as_str())
            .await?
        {
            tx.rollback().await?;
            return Err(ApiError::Conflict(format!("Ride is not {ride_from}")));
        }
        tx.commit().await?;

        self.cache.delete(&keys::ride_status(trip.ride_id)).await;
        Ok(())
    }

    /// Free a driver in both worlds after an aborted assignment or a status
    /// toggle: record store already updated, caches must follow.
    pub async fn evict_driver_from_pool(&self, driver_id: Uuid) {
        self.geo.remove(driver_id).await;
        self.cache.delete(&keys::driver_tier(driver_id)).await;
    }
}
