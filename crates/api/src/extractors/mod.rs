//! Request extractors.

pub mod auth;
pub mod idempotency_key;

pub use auth::{DriverAuth, RiderAuth};
pub use idempotency_key::OptionalIdempotencyKey;
