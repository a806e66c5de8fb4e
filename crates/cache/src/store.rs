//! TTL key-value store.
//!
//! Backs the driver locks, surge demand counters, tier/status lookasides, and
//! the idempotency response cache. Expiry is lazy on read plus a periodic
//! sweep driven by the cache-sweep job. Time comes from `tokio::time` so
//! tests can pause and advance the clock.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process key-value store with per-entry TTLs.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl CacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a live value; expired entries read as absent.
    pub async fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    /// Set a value with an optional TTL, replacing any previous entry.
    pub async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) {
        let entry = Entry {
            value: value.to_string(),
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries.write().await.insert(key.to_string(), entry);
    }

    /// Set-if-absent with a TTL. Returns true when the key was acquired.
    ///
    /// This is the driver lock primitive: an expired entry counts as absent.
    pub async fn set_nx(&self, key: &str, value: &str, ttl: Duration) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| !entry.is_expired(now)) {
            return false;
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        true
    }

    /// Delete a key. Returns true when a live entry was removed.
    pub async fn delete(&self, key: &str) -> bool {
        let now = Instant::now();
        match self.entries.write().await.remove(key) {
            Some(entry) => !entry.is_expired(now),
            None => false,
        }
    }

    /// Delete a key only if it still holds `value`.
    ///
    /// Lock release: a matcher that lost its lock to TTL expiry must not
    /// delete the next holder's lock.
    pub async fn delete_if(&self, key: &str, value: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let held = entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now) && entry.value == value);
        if held {
            entries.remove(key);
        }
        held
    }

    /// Increment a counter, creating it at 1, refreshing its TTL every time.
    pub async fn incr(&self, key: &str, ttl: Duration) -> i64 {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let current = entries
            .get(key)
            .filter(|entry| !entry.is_expired(now))
            .and_then(|entry| entry.value.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current + 1;
        entries.insert(
            key.to_string(),
            Entry {
                value: next.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        next
    }

    /// Decrement a counter without going below zero; absent reads as zero.
    /// The remaining TTL is left untouched.
    pub async fn decr_floor(&self, key: &str) -> i64 {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let Some(entry) = entries.get_mut(key).filter(|entry| !entry.is_expired(now)) else {
            return 0;
        };
        let current = entry.value.parse::<i64>().unwrap_or(0);
        let next = (current - 1).max(0);
        entry.value = next.to_string();
        next
    }

    /// Counter read; absent or expired reads as zero.
    pub async fn counter(&self, key: &str) -> i64 {
        self.get(key)
            .await
            .and_then(|value| value.parse::<i64>().ok())
            .unwrap_or(0)
    }

    /// Drop every expired entry; returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = CacheStore::new();
        store.set("k", "v", None).await;
        assert_eq!(store.get("k").await.as_deref(), Some("v"));
        assert!(store.delete("k").await);
        assert_eq!(store.get("k").await, None);
        assert!(!store.delete("k").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let store = CacheStore::new();
        store.set("k", "v", Some(Duration::from_secs(30))).await;
        assert!(store.get("k").await.is_some());

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(store.get("k").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_acquire_contend_expire() {
        let store = CacheStore::new();
        let ttl = Duration::from_secs(8);

        assert!(store.set_nx("driver:d1:lock", "ride-a", ttl).await);
        // Second matcher loses while the lock is live.
        assert!(!store.set_nx("driver:d1:lock", "ride-b", ttl).await);

        // Crash liveness: after the TTL the lock is free again.
        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.set_nx("driver:d1:lock", "ride-b", ttl).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lock_release_requires_ownership() {
        let store = CacheStore::new();
        let ttl = Duration::from_secs(8);
        assert!(store.set_nx("lock", "ride-a", ttl).await);

        // ride-b cannot release a lock it does not hold.
        assert!(!store.delete_if("lock", "ride-b").await);
        assert!(store.delete_if("lock", "ride-a").await);
        assert!(store.set_nx("lock", "ride-b", ttl).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_owner_cannot_release_new_lock() {
        let store = CacheStore::new();
        let ttl = Duration::from_secs(8);
        assert!(store.set_nx("lock", "ride-a", ttl).await);
        tokio::time::advance(Duration::from_secs(9)).await;
        assert!(store.set_nx("lock", "ride-b", ttl).await);

        // The expired holder's deferred release must be a no-op.
        assert!(!store.delete_if("lock", "ride-a").await);
        assert_eq!(store.get("lock").await.as_deref(), Some("ride-b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_incr_decr_floor() {
        let store = CacheStore::new();
        let ttl = Duration::from_secs(120);

        assert_eq!(store.incr("surge:demand:standard", ttl).await, 1);
        assert_eq!(store.incr("surge:demand:standard", ttl).await, 2);
        assert_eq!(store.decr_floor("surge:demand:standard").await, 1);
        assert_eq!(store.decr_floor("surge:demand:standard").await, 0);
        // Floor: never negative.
        assert_eq!(store.decr_floor("surge:demand:standard").await, 0);
        // Missing counters decrement to zero, not an error.
        assert_eq!(store.decr_floor("surge:demand:premium").await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_expires_as_safety_floor() {
        let store = CacheStore::new();
        let ttl = Duration::from_secs(120);
        store.incr("demand", ttl).await;
        store.incr("demand", ttl).await;

        tokio::time::advance(Duration::from_secs(121)).await;
        assert_eq!(store.counter("demand").await, 0);
        // A fresh increment restarts from scratch.
        assert_eq!(store.incr("demand", ttl).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = CacheStore::new();
        store.set("keep", "v", None).await;
        store.set("die", "v", Some(Duration::from_secs(5))).await;

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.get("keep").await.is_some());
    }
}
