//! Bearer-token authentication extractors.
//!
//! Token issuance is owned by an external identity service; here we verify
//! the HS256 signature and pull the subject identity out of the claims.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

fn bearer_subject(parts: &Parts, state: &AppState) -> Result<Uuid, ApiError> {
    let auth_header = parts
        .headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Invalid Authorization header format".to_string()))?;

    let claims = state
        .jwt
        .verify(token)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".to_string()))?;

    claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| ApiError::Unauthorized("Invalid token subject".to_string()))
}

/// Authenticated rider identity from the JWT subject claim.
#[derive(Debug, Clone, Copy)]
pub struct RiderAuth {
    pub rider_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for RiderAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self {
            rider_id: bearer_subject(parts, state)?,
        })
    }
}

/// Authenticated driver identity from the JWT subject claim.
#[derive(Debug, Clone, Copy)]
pub struct DriverAuth {
    pub driver_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for DriverAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self {
            driver_id: bearer_subject(parts, state)?,
        })
    }
}
