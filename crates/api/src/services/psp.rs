//! Payment service provider adapter.
//!
//! `PspClient` speaks HTTP to the configured provider; `charge_with_retry`
//! wraps any `PaymentProvider` with the bounded retry policy. Provider
//! transients are recovered here; exhaustion degrades to a FAILED result
//! rather than an error, leaving the ride retriable.

use std::time::Duration;

use domain::models::PaymentStatus;
use domain::services::{ChargeOutcome, ChargeRequest, PaymentProvider, ProviderError};
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::config::PspConfig;

/// Maximum charge attempts per payment request.
pub const MAX_ATTEMPTS: u32 = 3;

/// Terminal outcome of a charge after retries.
#[derive(Debug, Clone)]
pub struct ChargeResult {
    pub status: PaymentStatus,
    pub psp_ref: Option<String>,
}

/// HTTP adapter for the external payment provider.
pub struct PspClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct PspChargeResponse {
    id: String,
}

impl PspClient {
    pub fn new(config: &PspConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait::async_trait]
impl PaymentProvider for PspClient {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, ProviderError> {
        // Providers bill in minor units.
        let amount_minor = (request.amount * 100.0).round() as i64;

        let response = self
            .client
            .post(format!("{}/charges", self.base_url))
            .bearer_auth(&self.api_key)
            .header("Idempotency-Key", &request.idempotency_key)
            .json(&serde_json::json!({
                "amount": amount_minor,
                "currency": "inr",
                "source": request.method.as_str(),
                "customer": request.rider_id,
            }))
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() || status.as_u16() == 429 {
            return Err(ProviderError::Unavailable(format!(
                "provider returned {status}"
            )));
        }
        if status.is_client_error() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::Rejected(format!(
                "provider returned {status}: {detail}"
            )));
        }

        let body: PspChargeResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("undecodable response: {e}")))?;
        Ok(ChargeOutcome { reference: body.id })
    }
}

/// Charge with up to [`MAX_ATTEMPTS`] attempts and exponential backoff
/// (2 s, 4 s). Outright rejections are not retried.
pub async fn charge_with_retry(
    provider: &dyn PaymentProvider,
    request: ChargeRequest,
) -> ChargeResult {
    for attempt in 1..=MAX_ATTEMPTS {
        match provider.charge(request.clone()).await {
            Ok(outcome) => {
                info!(
                    psp_ref = %outcome.reference,
                    amount = request.amount,
                    attempt,
                    "Provider charge succeeded"
                );
                return ChargeResult {
                    status: PaymentStatus::Success,
                    psp_ref: Some(outcome.reference),
                };
            }
            Err(ProviderError::Rejected(reason)) => {
                warn!(reason = %reason, "Provider rejected charge");
                return ChargeResult {
                    status: PaymentStatus::Failed,
                    psp_ref: None,
                };
            }
            Err(ProviderError::Unavailable(reason)) => {
                if attempt == MAX_ATTEMPTS {
                    error!(
                        reason = %reason,
                        attempts = MAX_ATTEMPTS,
                        "Provider charge failed after all attempts"
                    );
                    break;
                }
                let backoff = Duration::from_secs(2u64.pow(attempt));
                warn!(
                    reason = %reason,
                    attempt,
                    backoff_secs = backoff.as_secs(),
                    "Provider charge failed, backing off"
                );
                tokio::time::sleep(backoff).await;
            }
        }
    }

    ChargeResult {
        status: PaymentStatus::Failed,
        psp_ref: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::PaymentMethod;
    use domain::services::MockPaymentProvider;
    use uuid::Uuid;

    fn request() -> ChargeRequest {
        ChargeRequest {
            rider_id: Uuid::new_v4(),
            amount: 2934.0,
            method: PaymentMethod::Card,
            idempotency_key: "pay-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let provider = MockPaymentProvider::new();
        let result = charge_with_retry(&provider, request()).await;
        assert_eq!(result.status, PaymentStatus::Success);
        assert!(result.psp_ref.is_some());
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_flap_recovers_on_third_attempt() {
        let provider = MockPaymentProvider::failing_first(2);
        let start = tokio::time::Instant::now();

        let result = charge_with_retry(&provider, request()).await;

        assert_eq!(result.status, PaymentStatus::Success);
        assert_eq!(provider.calls(), 3);
        // Backoff schedule: 2 s after attempt 1, 4 s after attempt 2.
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_failed_without_reference() {
        let provider = MockPaymentProvider::failing_first(3);
        let result = charge_with_retry(&provider, request()).await;
        assert_eq!(result.status, PaymentStatus::Failed);
        assert!(result.psp_ref.is_none());
        assert_eq!(provider.calls(), 3);
    }
}
