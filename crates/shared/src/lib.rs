//! Shared utilities for the ride dispatch backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Geographic distance math
//! - Monetary rounding helpers
//! - JWT token verification and issuance
//! - Common validation logic

pub mod geo;
pub mod jwt;
pub mod money;
pub mod validation;
