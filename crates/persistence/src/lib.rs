//! Persistence layer for the ride dispatch backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations with the row-locking primitives the
//!   matching engine and lifecycle controller build on
//! - Query timing metrics

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
