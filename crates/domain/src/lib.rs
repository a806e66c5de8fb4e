//! Domain layer for the ride dispatch backend.
//!
//! This crate contains:
//! - Domain models (Driver, Ride, Trip, Payment) and their status machines
//! - Request/response DTOs with validation
//! - Pure pricing logic (fares, surge mapping)
//! - The payment provider abstraction

pub mod models;
pub mod services;
