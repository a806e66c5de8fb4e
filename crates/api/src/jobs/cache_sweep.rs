//! Periodic sweep of expired cache entries and stale geo index entries.
//!
//! Expiry is already enforced lazily on every read; the sweep keeps memory
//! bounded and makes the surge supply signal honest between reads.

use std::sync::Arc;

use cache::{CacheStore, GeoIndex};
use tracing::debug;

use super::scheduler::{Job, JobFrequency};

pub struct CacheSweepJob {
    cache: Arc<CacheStore>,
    geo: Arc<GeoIndex>,
    interval_seconds: u64,
}

impl CacheSweepJob {
    pub fn new(cache: Arc<CacheStore>, geo: Arc<GeoIndex>, interval_seconds: u64) -> Self {
        Self {
            cache,
            geo,
            interval_seconds,
        }
    }
}

#[async_trait::async_trait]
impl Job for CacheSweepJob {
    fn name(&self) -> &'static str {
        "cache_sweep"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_seconds.max(1))
    }

    async fn execute(&self) -> Result<(), String> {
        let expired = self.cache.purge_expired().await;
        let stale = self.geo.purge_stale().await;
        if expired > 0 || stale > 0 {
            debug!(expired, stale, "Swept cache and geo index");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_sweep_drops_expired_and_stale() {
        let cache = Arc::new(CacheStore::new());
        let geo = Arc::new(GeoIndex::new());
        cache.set("k", "v", Some(Duration::from_secs(5))).await;
        geo.upsert(
            domain::models::ServiceTier::Standard,
            uuid::Uuid::new_v4(),
            12.97,
            77.59,
        )
        .await;

        tokio::time::advance(Duration::from_secs(31)).await;

        let job = CacheSweepJob::new(Arc::clone(&cache), Arc::clone(&geo), 30);
        job.execute().await.expect("sweep");
        assert_eq!(cache.get("k").await, None);
        assert_eq!(
            geo.supply(domain::models::ServiceTier::Standard).await,
            0
        );
    }
}
