//! Middleware components.

pub mod logging;
pub mod metrics;

pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
