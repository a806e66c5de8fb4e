//! Core dispatch services.

pub mod idempotency;
pub mod lifecycle;
pub mod location;
pub mod matching;
pub mod psp;
pub mod surge;
