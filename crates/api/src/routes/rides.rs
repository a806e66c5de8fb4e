//! Ride endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{OptionalIdempotencyKey, RiderAuth};
use crate::services::idempotency;
use crate::services::matching::MatchingEngine;
use cache::keys;
use domain::models::ride::{
    CreateRideRequest, CreateRideResponse, DriverBrief, RideStatusResponse,
};
use domain::models::RideStatus;
use domain::services::pricing;
use persistence::repositories::{CreateRideInput, DriverRepository, RideRepository};
use shared::geo::haversine_km;

/// Request a ride.
///
/// POST /v1/rides
///
/// Captures the surge multiplier, persists the REQUESTED ride, bumps the
/// demand counter, and hands the ride to a spawned matching task.
pub async fn create_ride(
    State(state): State<AppState>,
    rider: RiderAuth,
    OptionalIdempotencyKey(idempotency_key): OptionalIdempotencyKey,
    Json(request): Json<CreateRideRequest>,
) -> Result<Response, ApiError> {
    if let Some(ref key) = idempotency_key {
        if let Some(stored) = idempotency::check(&state.cache, key).await {
            return Ok(idempotency::replay_response(stored));
        }
    }

    request.validate()?;

    let tier = request.tier;
    let surge_multiplier = state.surge.compute(tier).await;

    let distance_km = haversine_km(
        request.pickup_lat,
        request.pickup_lng,
        request.dest_lat,
        request.dest_lng,
    );
    let estimated_fare = pricing::estimate_fare_range(tier, distance_km, surge_multiplier);

    let rides = RideRepository::new(state.pool.clone());
    let ride = rides
        .create(CreateRideInput {
            rider_id: rider.rider_id,
            pickup_lat: request.pickup_lat,
            pickup_lng: request.pickup_lng,
            dest_lat: request.dest_lat,
            dest_lng: request.dest_lng,
            tier: tier.as_str().to_string(),
            payment_method: request.payment_method.as_str().to_string(),
            surge_multiplier,
            idempotency_key: idempotency_key.clone(),
        })
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                // Two racers with the same token: the row is the backstop
                // even when the replay cache has not been written yet.
                ApiError::Conflict("Duplicate idempotent request in flight".to_string())
            }
            _ => e.into(),
        })?;

    state.surge.increment_demand(tier).await;

    // Matching runs as its own task with its own pool handle; the request
    // returns as soon as the ride is durable.
    let engine = MatchingEngine::new(
        state.pool.clone(),
        state.cache.clone(),
        state.geo.clone(),
        state.surge.clone(),
        state.config.matching.clone(),
    );
    let (ride_id, pickup_lat, pickup_lng) = (ride.id, ride.pickup_lat, ride.pickup_lng);
    tokio::spawn(async move {
        engine.run(ride_id, pickup_lat, pickup_lng, tier).await;
    });

    let response = CreateRideResponse {
        id: ride.id,
        status: RideStatus::Requested,
        surge_multiplier,
        estimated_fare,
        created_at: ride.created_at,
    };

    if let Some(ref key) = idempotency_key {
        idempotency::store(&state.cache, key, StatusCode::CREATED, &response).await;
    }

    info!(
        ride_id = %ride.id,
        rider_id = %rider.rider_id,
        tier = %tier,
        surge_multiplier,
        "Ride requested"
    );
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// Current ride status, read-through cached for 60 seconds.
///
/// GET /v1/rides/{id}
pub async fn get_ride(
    State(state): State<AppState>,
    _rider: RiderAuth,
    Path(ride_id): Path<Uuid>,
) -> Result<Json<RideStatusResponse>, ApiError> {
    let cache_key = keys::ride_status(ride_id);

    if let Some(cached) = state.cache.get(&cache_key).await {
        if let Ok(response) = serde_json::from_str::<RideStatusResponse>(&cached) {
            return Ok(Json(response));
        }
        state.cache.delete(&cache_key).await;
    }

    let ride = RideRepository::new(state.pool.clone())
        .find_by_id(ride_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Ride not found".to_string()))?;

    let driver = match ride.driver_id {
        Some(driver_id) => DriverRepository::new(state.pool.clone())
            .find_by_id(driver_id)
            .await?
            .map(|d| DriverBrief {
                id: d.id,
                name: d.name,
                phone: d.phone,
            }),
        None => None,
    };

    let response = RideStatusResponse {
        id: ride.id,
        status: RideStatus::from_str(&ride.status).unwrap_or(RideStatus::Requested),
        driver,
        surge_multiplier: ride.surge_multiplier,
        updated_at: ride.updated_at,
    };

    if let Ok(raw) = serde_json::to_string(&response) {
        state
            .cache
            .set(&cache_key, &raw, Some(keys::RIDE_STATUS_TTL))
            .await;
    }

    Ok(Json(response))
}
