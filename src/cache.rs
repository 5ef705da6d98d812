//! TTL cache for assembled snapshots, keyed by cohort.
//!
//! The host owns the instance and passes it to whoever computes snapshots.
//! There is no single-flight: two callers missing the same key at once will
//! both compute, which is harmless because computation is deterministic.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use mini_moka::sync::Cache;

use crate::config::PipelineConfig;
use crate::models::ProcessedSnapshot;

/// Cohorts kept at once; the least recently used one is evicted beyond this.
const MAX_CACHED_COHORTS: u64 = 64;

#[derive(Clone)]
pub struct SnapshotCache {
    entries: Cache<String, Arc<ProcessedSnapshot>>,
}

impl SnapshotCache {
    pub fn new(ttl: Duration) -> Self {
        let entries = Cache::builder()
            .max_capacity(MAX_CACHED_COHORTS)
            .time_to_live(ttl)
            .build();
        Self { entries }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.cache_ttl())
    }

    /// Expired entries read as absent and are dropped by the cache's own
    /// housekeeping.
    pub fn get(&self, key: &str) -> Option<Arc<ProcessedSnapshot>> {
        self.entries.get(&key.to_string())
    }

    pub fn insert(&self, key: &str, snapshot: ProcessedSnapshot) -> Arc<ProcessedSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.entries.insert(key.to_string(), snapshot.clone());
        snapshot
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.invalidate(&key.to_string());
    }

    /// Returns the cached snapshot for `key`, or computes and stores a new one.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        compute: F,
    ) -> Result<Arc<ProcessedSnapshot>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ProcessedSnapshot, E>>,
    {
        if let Some(snapshot) = self.get(key) {
            tracing::debug!(key, "snapshot cache hit");
            return Ok(snapshot);
        }
        let snapshot = compute().await?;
        Ok(self.insert(key, snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn snapshot(responses: usize) -> ProcessedSnapshot {
        let mut snapshot = ProcessedSnapshot::default();
        snapshot.totals.total_responses = responses;
        snapshot
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = SnapshotCache::new(Duration::from_millis(200));
        cache.insert("cohort-a", snapshot(3));
        assert_eq!(cache.get("cohort-a").unwrap().totals.total_responses, 3);

        std::thread::sleep(Duration::from_millis(400));
        assert!(cache.get("cohort-a").is_none());
    }

    #[test]
    fn many_one_off_cohorts_all_expire() {
        let cache = SnapshotCache::new(Duration::from_millis(100));
        for i in 0..100 {
            cache.insert(&format!("cohort-{i}"), snapshot(i));
        }

        std::thread::sleep(Duration::from_millis(300));
        assert!((0..100).all(|i| cache.get(&format!("cohort-{i}")).is_none()));
    }

    #[test]
    fn ttl_comes_from_config() {
        let config = PipelineConfig::from_toml("cache_ttl_secs = 60").unwrap();
        let cache = SnapshotCache::from_config(&config);
        cache.insert("cohort-d", snapshot(2));
        assert_eq!(cache.get("cohort-d").unwrap().totals.total_responses, 2);
    }

    #[tokio::test]
    async fn get_or_compute_runs_once_per_live_entry() {
        let cache = SnapshotCache::new(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..3 {
            let result = cache
                .get_or_compute("cohort-b", || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(snapshot(1))
                })
                .await
                .unwrap();
            assert_eq!(result.totals.total_responses, 1);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        cache.invalidate("cohort-b");
        assert!(cache.get("cohort-b").is_none());
    }

    #[tokio::test]
    async fn failed_compute_caches_nothing() {
        let cache = SnapshotCache::new(Duration::from_secs(60));
        let result = cache
            .get_or_compute("cohort-c", || async { Err::<ProcessedSnapshot, _>("fetch failed") })
            .await;
        assert_eq!(result.unwrap_err(), "fetch failed");
        assert!(cache.get("cohort-c").is_none());
    }
}
