//! Replay-safe response cache keyed by client idempotency tokens.
//!
//! A hit returns the stored response verbatim, annotated with the replay
//! header, without re-executing side effects. The terminal response is stored
//! just before returning to the client.

use std::sync::Arc;

use axum::http::{header::HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use cache::{keys, CacheStore};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::extractors::idempotency_key::IDEMPOTENCY_REPLAY_HEADER;

/// A cached terminal response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredResponse {
    pub status_code: u16,
    pub body: serde_json::Value,
}

/// Look up a previously stored response for this token.
pub async fn check(cache: &Arc<CacheStore>, key: &str) -> Option<StoredResponse> {
    let raw = cache.get(&keys::idempotency(key)).await?;
    match serde_json::from_str::<StoredResponse>(&raw) {
        Ok(stored) => {
            info!(idempotency_key = %key, "Returning cached response for idempotent request");
            Some(stored)
        }
        Err(e) => {
            warn!(idempotency_key = %key, error = %e, "Discarding undecodable idempotency entry");
            None
        }
    }
}

/// Store the terminal response for this token (24 h TTL).
pub async fn store(
    cache: &Arc<CacheStore>,
    key: &str,
    status_code: StatusCode,
    body: &impl Serialize,
) {
    let stored = StoredResponse {
        status_code: status_code.as_u16(),
        body: serde_json::to_value(body).unwrap_or(serde_json::Value::Null),
    };
    match serde_json::to_string(&stored) {
        Ok(raw) => {
            cache
                .set(&keys::idempotency(key), &raw, Some(keys::IDEMPOTENCY_TTL))
                .await;
        }
        Err(e) => warn!(idempotency_key = %key, error = %e, "Failed to store idempotency entry"),
    }
}

/// Build the replay response: identical body and status, plus the marker
/// header telling the caller this did not re-execute.
pub fn replay_response(stored: StoredResponse) -> Response {
    let status = StatusCode::from_u16(stored.status_code).unwrap_or(StatusCode::OK);
    let mut response = (status, Json(stored.body)).into_response();
    response.headers_mut().insert(
        HeaderName::from_static(IDEMPOTENCY_REPLAY_HEADER),
        "true".parse().expect("valid header value"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_then_check_round_trip() {
        let cache = Arc::new(CacheStore::new());
        let body = serde_json::json!({"id": "r1", "status": "REQUESTED"});

        assert!(check(&cache, "tok-1").await.is_none());
        store(&cache, "tok-1", StatusCode::CREATED, &body).await;

        let stored = check(&cache, "tok-1").await.expect("hit");
        assert_eq!(stored.status_code, 201);
        assert_eq!(stored.body, body);
    }

    #[tokio::test]
    async fn test_replay_response_sets_marker_header() {
        let stored = StoredResponse {
            status_code: 201,
            body: serde_json::json!({"ok": true}),
        };
        let response = replay_response(stored);
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response
                .headers()
                .get(IDEMPOTENCY_REPLAY_HEADER)
                .and_then(|v| v.to_str().ok()),
            Some("true")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire_after_a_day() {
        let cache = Arc::new(CacheStore::new());
        store(&cache, "tok", StatusCode::OK, &serde_json::json!({})).await;
        tokio::time::advance(std::time::Duration::from_secs(24 * 60 * 60 + 1)).await;
        assert!(check(&cache, "tok").await.is_none());
    }
}
