//! Ephemeral-state layer for the ride dispatch backend.
//!
//! Everything in this crate is derived, reconstructable state with a TTL:
//! - `store`: TTL key-value cache (status cache, tier cache, driver locks,
//!   surge demand counters, idempotency response cache)
//! - `geo`: tier-partitioned geospatial index of available drivers
//! - `keys`: the shared cache keyspace and TTL constants
//!
//! Durable truth lives in the record store; on any disagreement the record
//! store wins and these structures heal via expiry.

pub mod geo;
pub mod keys;
pub mod store;

pub use geo::{GeoIndex, NearbyDriver};
pub use store::CacheStore;
