//! Trip endpoint handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::DriverAuth;
use domain::models::trip::{TripEndRequest, TripEndResponse, TripStateResponse};

/// Rider picked up; the trip is underway.
///
/// POST /v1/trips/{id}/start
pub async fn start_trip(
    State(state): State<AppState>,
    auth: DriverAuth,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripStateResponse>, ApiError> {
    Ok(Json(
        state.lifecycle.start_trip(trip_id, auth.driver_id).await?,
    ))
}

/// Pause a running trip (rider stop-over).
///
/// POST /v1/trips/{id}/pause
pub async fn pause_trip(
    State(state): State<AppState>,
    auth: DriverAuth,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripStateResponse>, ApiError> {
    Ok(Json(
        state.lifecycle.pause_trip(trip_id, auth.driver_id).await?,
    ))
}

/// Resume a paused trip.
///
/// POST /v1/trips/{id}/resume
pub async fn resume_trip(
    State(state): State<AppState>,
    auth: DriverAuth,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripStateResponse>, ApiError> {
    Ok(Json(
        state.lifecycle.resume_trip(trip_id, auth.driver_id).await?,
    ))
}

/// End a trip at the drop-off point: settle distance and fares, free the
/// driver, and open a PENDING payment.
///
/// POST /v1/trips/{id}/end
pub async fn end_trip(
    State(state): State<AppState>,
    auth: DriverAuth,
    Path(trip_id): Path<Uuid>,
    Json(request): Json<TripEndRequest>,
) -> Result<Json<TripEndResponse>, ApiError> {
    request.validate()?;

    let response = state
        .lifecycle
        .end_trip(trip_id, auth.driver_id, request.final_lat, request.final_lng)
        .await?;
    Ok(Json(response))
}
