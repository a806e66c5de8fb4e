//! Payment provider abstraction.
//!
//! The real adapter speaks HTTP to the PSP; the mock stands in for tests and
//! for deployments without provider credentials.

use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::payment::PaymentMethod;

/// Errors surfaced by a payment provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider rejected the charge outright; retrying cannot help.
    #[error("Charge rejected: {0}")]
    Rejected(String),

    /// Transient failure (timeout, 5xx, connection reset); safe to retry.
    #[error("Provider unavailable: {0}")]
    Unavailable(String),
}

/// A charge to submit to the provider.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub rider_id: Uuid,
    /// Major-unit amount; adapters convert to minor units on the wire.
    pub amount: f64,
    pub method: PaymentMethod,
    /// Forwarded as the provider's own idempotency header where supported.
    pub idempotency_key: String,
}

/// A successful charge.
#[derive(Debug, Clone)]
pub struct ChargeOutcome {
    /// Opaque provider reference identifying the charge.
    pub reference: String,
}

/// Payment provider trait implemented by the PSP adapter and the mock.
#[async_trait::async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, ProviderError>;
}

/// In-process provider that succeeds after a scriptable number of failures.
pub struct MockPaymentProvider {
    fail_first: AtomicU32,
    calls: AtomicU32,
}

impl MockPaymentProvider {
    /// A provider that always succeeds.
    pub fn new() -> Self {
        Self::failing_first(0)
    }

    /// A provider whose first `n` charges fail with a transient error.
    pub fn failing_first(n: u32) -> Self {
        Self {
            fail_first: AtomicU32::new(n),
            calls: AtomicU32::new(0),
        }
    }

    /// Number of charge attempts observed so far.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockPaymentProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn charge(&self, request: ChargeRequest) -> Result<ChargeOutcome, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_first.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_first.store(remaining - 1, Ordering::SeqCst);
            return Err(ProviderError::Unavailable("simulated outage".to_string()));
        }

        let reference = format!(
            "PSP-{}",
            Uuid::new_v4().simple().to_string()[..12].to_uppercase()
        );
        debug!(
            rider_id = %request.rider_id,
            amount = request.amount,
            reference = %reference,
            "Mock provider charge accepted"
        );
        Ok(ChargeOutcome { reference })
    }
}
