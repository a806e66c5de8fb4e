use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// State-machine violation or concurrent conflict.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Semantically invalid input (bad amount, tier mismatch, tampered fare).
    #[error("Invalid: {0}")]
    Invalid(String),

    /// Schema-level validation failure.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Payment provider breakage surfaced outside the payment-status channel.
    #[error("External service failure: {0}")]
    External(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg.clone()),
            ApiError::Invalid(msg) => (StatusCode::BAD_REQUEST, "invalid", msg.clone()),
            ApiError::Validation(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                msg.clone(),
            ),
            ApiError::External(msg) => (StatusCode::BAD_GATEWAY, "external_failure", msg.clone()),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".into(),
                )
            }
        };

        let body = ErrorBody {
            error: error_code.into(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".into()),
            sqlx::Error::Database(db_err) => {
                if let Some(code) = db_err.code() {
                    match code.as_ref() {
                        "23505" => ApiError::Conflict("Resource already exists".into()),
                        "23503" => ApiError::NotFound("Referenced resource not found".into()),
                        _ => ApiError::Internal(format!("Database error: {}", db_err)),
                    }
                } else {
                    ApiError::Internal(format!("Database error: {}", db_err))
                }
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    format!(
                        "{}: {}",
                        field,
                        e.message.clone().unwrap_or_else(|| "invalid".into())
                    )
                })
            })
            .collect();

        ApiError::Validation(messages.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Probe {
        #[validate(custom(function = "shared::validation::validate_latitude"))]
        lat: f64,
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ApiError::Unauthorized("x".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ApiError::Conflict("x".into()), StatusCode::CONFLICT),
            (ApiError::Invalid("x".into()), StatusCode::BAD_REQUEST),
            (
                ApiError::Validation("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ApiError::External("x".into()), StatusCode::BAD_GATEWAY),
            (
                ApiError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_validation_errors_map_to_422() {
        let err: ApiError = Probe { lat: 91.0 }.validate().unwrap_err().into();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn test_unique_violation_maps_to_conflict() {
        let err: ApiError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
