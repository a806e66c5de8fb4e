//! Driver endpoint handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::str::FromStr;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::DriverAuth;
use domain::models::driver::{
    AcceptRideRequest, AcceptRideResponse, DriverResponse, DriverStatusResponse,
    LocationUpdateRequest, RegisterDriverRequest,
};
use domain::models::DriverStatus;
use persistence::repositories::DriverRepository;

/// Register a new driver. No bearer token required for onboarding.
///
/// POST /v1/drivers
pub async fn register_driver(
    State(state): State<AppState>,
    Json(request): Json<RegisterDriverRequest>,
) -> Result<(StatusCode, Json<DriverResponse>), ApiError> {
    request.validate()?;

    let repo = DriverRepository::new(state.pool.clone());
    let driver = repo
        .create(&request.name, &request.phone, request.tier.as_str())
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
                ApiError::Conflict("Phone number already registered".to_string())
            }
            _ => e.into(),
        })?;

    info!(driver_id = %driver.id, tier = %driver.tier, "Driver registered");
    Ok((StatusCode::CREATED, Json(driver.into_domain().into())))
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub new_status: String,
}

/// Toggle a driver between offline and available.
///
/// PATCH /v1/drivers/{id}/status?new_status=...
///
/// `on_trip` is owned by the matching engine and cannot be set here.
pub async fn update_status(
    State(state): State<AppState>,
    auth: DriverAuth,
    Path(driver_id): Path<Uuid>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<DriverStatusResponse>, ApiError> {
    if auth.driver_id != driver_id {
        return Err(ApiError::Unauthorized(
            "Token subject does not match driver".to_string(),
        ));
    }

    let new_status = DriverStatus::from_str(&query.new_status)
        .map_err(|_| ApiError::Invalid("status must be one of: offline, available".to_string()))?;
    let from = match new_status {
        DriverStatus::Available => DriverStatus::Offline,
        DriverStatus::Offline => DriverStatus::Available,
        DriverStatus::OnTrip => {
            return Err(ApiError::Invalid(
                "on_trip is owned by the matching engine".to_string(),
            ))
        }
    };

    let repo = DriverRepository::new(state.pool.clone());
    let flipped = repo
        .update_status(driver_id, from.as_str(), new_status.as_str())
        .await?;

    if !flipped {
        let driver = repo
            .find_by_id(driver_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Driver not found".to_string()))?;
        return Err(ApiError::Conflict(format!(
            "Driver is {}, cannot become {}",
            driver.status, new_status
        )));
    }

    // Keep the derived state in step with the toggle: offline drivers leave
    // the pool immediately; available drivers rejoin at their last position.
    match new_status {
        DriverStatus::Available => {
            let driver = repo.find_by_id(driver_id).await?;
            if let Some(driver) = driver {
                if let (Some(lat), Some(lng)) = (driver.lat, driver.lng) {
                    let tier = driver.into_domain().tier;
                    state.geo.upsert(tier, driver_id, lat, lng).await;
                }
            }
        }
        _ => {
            state.lifecycle.evict_driver_from_pool(driver_id).await;
        }
    }
    state
        .cache
        .delete(&cache::keys::driver_tier(driver_id))
        .await;

    info!(driver_id = %driver_id, status = %new_status, "Driver status updated");
    Ok(Json(DriverStatusResponse {
        id: driver_id,
        status: new_status,
    }))
}

/// High-frequency location ping.
///
/// POST /v1/drivers/{id}/location
///
/// Fast path writes the cache and geo index; the durable update rides the
/// flush queue and never blocks the response.
pub async fn update_location(
    State(state): State<AppState>,
    Path(driver_id): Path<Uuid>,
    Json(request): Json<LocationUpdateRequest>,
) -> Result<StatusCode, ApiError> {
    request.validate()?;

    state
        .location
        .ingest(driver_id, request.lat, request.lng, request.timestamp)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Driver accepts a ride offer.
///
/// POST /v1/drivers/{id}/accept
///
/// The authenticated driver must be both the path driver and the driver the
/// matching engine assigned to the ride.
pub async fn accept_ride(
    State(state): State<AppState>,
    auth: DriverAuth,
    Path(driver_id): Path<Uuid>,
    Json(request): Json<AcceptRideRequest>,
) -> Result<Json<AcceptRideResponse>, ApiError> {
    if auth.driver_id != driver_id {
        return Err(ApiError::Unauthorized(
            "Token subject does not match driver".to_string(),
        ));
    }

    let response = state
        .lifecycle
        .accept_ride(driver_id, request.ride_id)
        .await?;
    Ok(Json(response))
}
