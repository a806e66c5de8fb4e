//! Payment endpoint handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{OptionalIdempotencyKey, RiderAuth};
use crate::services::idempotency;
use crate::services::psp::charge_with_retry;
use cache::keys;
use domain::models::payment::{PaymentRequest, PaymentResponse};
use domain::models::{PaymentStatus, RideStatus, TripStatus};
use domain::services::ChargeRequest;
use persistence::repositories::{PaymentRepository, RideRepository, TripRepository};
use shared::money::amounts_match;

/// Settle a completed trip.
///
/// POST /v1/payments
///
/// - Idempotent: repeated calls with the same key return the same result.
/// - The amount must match the server-side trip total; the client can never
///   override the fare.
/// - The provider is charged with bounded retry; exhaustion leaves the ride
///   in PAYMENT_FAILED, which is retriable with a fresh call.
pub async fn create_payment(
    State(state): State<AppState>,
    rider: RiderAuth,
    OptionalIdempotencyKey(idempotency_key): OptionalIdempotencyKey,
    Json(request): Json<PaymentRequest>,
) -> Result<Response, ApiError> {
    if let Some(ref key) = idempotency_key {
        if let Some(stored) = idempotency::check(&state.cache, key).await {
            return Ok(idempotency::replay_response(stored));
        }
    }

    request.validate()?;

    let trips = TripRepository::new(state.pool.clone());
    let rides = RideRepository::new(state.pool.clone());
    let payments = PaymentRepository::new(state.pool.clone());

    let trip = trips
        .find_by_id(request.trip_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Trip not found".to_string()))?;
    if trip.rider_id != rider.rider_id {
        return Err(ApiError::NotFound("Trip not found".to_string()));
    }
    if trip.status != TripStatus::Completed.as_str() {
        return Err(ApiError::Conflict("Trip is not yet completed".to_string()));
    }

    let payment = payments
        .find_by_trip_id(trip.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Payment record not found".to_string()))?;

    // Already settled: hand back the prior result unchanged.
    if payment.status == PaymentStatus::Success.as_str() {
        let response = PaymentResponse {
            payment_id: payment.id,
            status: PaymentStatus::Success,
            psp_ref: payment.psp_ref,
            amount: payment.amount,
            currency: payment.currency,
        };
        return Ok((StatusCode::OK, Json(response)).into_response());
    }

    // Server-side amount validation; no provider call on a mismatch.
    let server_amount = trip
        .total_fare
        .ok_or_else(|| ApiError::Internal("Completed trip missing fare".to_string()))?;
    if server_amount <= 0.0 {
        return Err(ApiError::Invalid("Amount must be positive".to_string()));
    }
    if !amounts_match(request.amount, server_amount) {
        return Err(ApiError::Invalid(format!(
            "Amount mismatch. Expected {server_amount:.2}"
        )));
    }

    // A FAILED payment reopens for this attempt: FAILED → PENDING on the
    // payment row, PAYMENT_FAILED → PAYMENT_PENDING on the ride.
    if payment.status == PaymentStatus::Failed.as_str() {
        payments.reopen(payment.id).await?;
        rides
            .transition_status(
                trip.ride_id,
                RideStatus::PaymentFailed.as_str(),
                RideStatus::PaymentPending.as_str(),
            )
            .await?;
    }

    // Defence-in-depth: the token lives on the row even if the cache is lost.
    if let Some(ref key) = idempotency_key {
        payments.set_idempotency_key(payment.id, key).await?;
    }

    let charge_key = idempotency_key
        .clone()
        .unwrap_or_else(|| payment.id.to_string());
    let result = charge_with_retry(
        state.provider.as_ref(),
        ChargeRequest {
            rider_id: trip.rider_id,
            amount: server_amount,
            method: request.payment_method,
            idempotency_key: charge_key,
        },
    )
    .await;

    let ride_next = match result.status {
        PaymentStatus::Success => RideStatus::Completed,
        _ => RideStatus::PaymentFailed,
    };

    let mut tx = state.pool.begin().await?;
    payments
        .settle(
            &mut tx,
            payment.id,
            result.status.as_str(),
            result.psp_ref.as_deref(),
        )
        .await?;
    rides
        .transition(
            &mut *tx,
            trip.ride_id,
            RideStatus::PaymentPending.as_str(),
            ride_next.as_str(),
        )
        .await?;
    tx.commit().await?;

    state.cache.delete(&keys::ride_status(trip.ride_id)).await;

    let response = PaymentResponse {
        payment_id: payment.id,
        status: result.status,
        psp_ref: result.psp_ref,
        amount: server_amount,
        currency: payment.currency,
    };

    if let Some(ref key) = idempotency_key {
        idempotency::store(&state.cache, key, StatusCode::OK, &response).await;
    }

    info!(
        payment_id = %payment.id,
        trip_id = %trip.id,
        status = %response.status,
        "Payment processed"
    );
    Ok((StatusCode::OK, Json(response)).into_response())
}
