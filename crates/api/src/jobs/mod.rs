//! Background jobs.

pub mod cache_sweep;
pub mod pool_metrics;
pub mod scheduler;

pub use cache_sweep::CacheSweepJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
