//! Cache-aside coordination.
//!
//! Reads of expensive derived values go through [`CacheAside`]: check the
//! cache, compute on miss, store, then re-read so hit and miss share one
//! code path. A per-key in-flight lock collapses concurrent misses into a
//! single rebuild.

use std::{collections::HashMap, future::Future, sync::Arc, sync::Mutex as StdMutex};

use tokio::sync::Mutex;
use tracing::warn;

use crate::{cache::CacheHandle, HorusResult};

pub struct CacheAside {
    cache: CacheHandle,
    inflight: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl CacheAside {
    pub fn new(cache: CacheHandle) -> Self {
        Self {
            cache,
            inflight: StdMutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value under `key`, computing and storing it on a
    /// miss. Concurrent misses for the same key wait for the first builder
    /// instead of duplicating its work.
    pub async fn get_or_build<F, Fut>(&self, key: &str, builder: F) -> HorusResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = HorusResult<String>>,
    {
        self.get_or_build_with(key, || async { builder().await.map(|v| (v, true)) })
            .await
    }

    /// Like [`get_or_build`](Self::get_or_build), but the builder decides
    /// whether its result is worth caching (e.g. empty listings are not).
    pub async fn get_or_build_with<F, Fut>(&self, key: &str, builder: F) -> HorusResult<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = HorusResult<(String, bool)>>,
    {
        if let Some(hit) = self.read(key) {
            return Ok(hit);
        }

        let lock = self.key_lock(key);
        let result = async {
            let _guard = lock.lock().await;

            // a racing caller may have built it while we waited
            if let Some(hit) = self.read(key) {
                return Ok(hit);
            }

            let (value, cacheable) = builder().await?;
            if cacheable {
                self.write(key, &value);
                if let Some(stored) = self.read(key) {
                    return Ok(stored);
                }
            }
            Ok(value)
        }
        .await;

        self.release_key(key, &lock);
        result
    }

    /// Two-key variant for the catalog's list/index pair: both values are
    /// produced by one builder invocation and written together as a single
    /// generation before either is served.
    pub async fn get_or_build_pair<F, Fut>(
        &self,
        keys: (&str, &str),
        builder: F,
    ) -> HorusResult<(String, String)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = HorusResult<(String, String)>>,
    {
        if let (Some(first), Some(second)) = (self.read(keys.0), self.read(keys.1)) {
            return Ok((first, second));
        }

        let lock = self.key_lock(keys.0);
        let result = async {
            let _guard = lock.lock().await;

            if let (Some(first), Some(second)) = (self.read(keys.0), self.read(keys.1)) {
                return Ok((first, second));
            }

            let (first, second) = builder().await?;
            self.write(keys.1, &second);
            self.write(keys.0, &first);

            if let (Some(first), Some(second)) = (self.read(keys.0), self.read(keys.1)) {
                return Ok((first, second));
            }
            Ok((first, second))
        }
        .await;

        self.release_key(keys.0, &lock);
        result
    }

    /// Clears the entire cache. Called after every successful mutation.
    pub fn invalidate(&self) {
        if let Err(err) = self.cache.flush() {
            warn!("cache flush failed: {err}");
        }
    }

    fn key_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().unwrap();
        inflight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drops the key's in-flight entry once no other caller holds it, so
    /// the map does not grow with every distinct key ever requested.
    fn release_key(&self, key: &str, lock: &Arc<Mutex<()>>) {
        let mut inflight = self.inflight.lock().unwrap();
        // two strong refs mean the map and our own clone; anything more is
        // a caller still waiting on this key
        if Arc::strong_count(lock) <= 2 {
            inflight.remove(key);
        }
    }

    #[cfg(test)]
    fn inflight_len(&self) -> usize {
        self.inflight.lock().unwrap().len()
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.cache.get(key) {
            Ok(value) => value,
            Err(err) => {
                warn!("cache read for `{key}` failed, treating as miss: {err}");
                None
            }
        }
    }

    fn write(&self, key: &str, value: &str) {
        if let Err(err) = self.cache.set(key, value) {
            warn!("cache write for `{key}` failed: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;
    use crate::cache::MemoryCache;

    fn coordinator() -> CacheAside {
        CacheAside::new(Arc::new(MemoryCache::new()))
    }

    #[tokio::test]
    async fn test_miss_builds_then_hit_serves_cached() {
        let aside = coordinator();
        let builds = AtomicU64::new(0);

        for _ in 0..3 {
            let value = aside
                .get_or_build("k", || async {
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok("built".to_string())
                })
                .await
                .unwrap();
            assert_eq!(value, "built");
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_rebuild() {
        let aside = coordinator();
        let builds = AtomicU64::new(0);

        let build = || async {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok("v".to_string())
        };
        aside.get_or_build("k", build).await.unwrap();
        aside.invalidate();
        aside
            .get_or_build("k", || async {
                builds.fetch_add(1, Ordering::SeqCst);
                Ok("v".to_string())
            })
            .await
            .unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_uncacheable_result_is_rebuilt_every_time() {
        let aside = coordinator();
        let builds = AtomicU64::new(0);

        for _ in 0..2 {
            let value = aside
                .get_or_build_with("k", || async {
                    builds.fetch_add(1, Ordering::SeqCst);
                    Ok(("[]".to_string(), false))
                })
                .await
                .unwrap();
            assert_eq!(value, "[]");
        }

        assert_eq!(builds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_concurrent_misses_collapse_to_one_build() {
        let aside = Arc::new(coordinator());
        let builds = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let aside = aside.clone();
            let builds = builds.clone();
            handles.push(tokio::spawn(async move {
                aside
                    .get_or_build("k", || async move {
                        builds.fetch_add(1, Ordering::SeqCst);
                        // let the other tasks pile up on the key lock
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok("built".to_string())
                    })
                    .await
                    .unwrap()
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap(), "built");
        }
        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(aside.inflight_len(), 0);
    }

    #[tokio::test]
    async fn test_inflight_locks_released_after_build() {
        let aside = coordinator();

        for key in ["a", "b", "c"] {
            aside
                .get_or_build(key, || async { Ok("v".to_string()) })
                .await
                .unwrap();
        }
        // warm hits never touch the lock map at all
        aside
            .get_or_build("a", || async { Ok("v".to_string()) })
            .await
            .unwrap();

        assert_eq!(aside.inflight_len(), 0);

        aside
            .get_or_build_pair(("list", "index"), || async {
                Ok(("l".to_string(), "i".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(aside.inflight_len(), 0);
    }

    #[tokio::test]
    async fn test_pair_written_as_one_generation() {
        let aside = coordinator();

        let (list, index) = aside
            .get_or_build_pair(("list", "index"), || async {
                Ok(("the list".to_string(), "the index".to_string()))
            })
            .await
            .unwrap();
        assert_eq!(list, "the list");
        assert_eq!(index, "the index");

        // second read must not invoke the builder
        let (list, index) = aside
            .get_or_build_pair(("list", "index"), || async {
                panic!("builder must not run on a warm cache")
            })
            .await
            .unwrap();
        assert_eq!(list, "the list");
        assert_eq!(index, "the index");
    }

    #[tokio::test]
    async fn test_failing_cache_backend_falls_through_to_builder() {
        struct BrokenCache;
        impl crate::cache::Cache for BrokenCache {
            fn get(&self, _: &str) -> Result<Option<String>, crate::cache::CacheError> {
                Err(crate::cache::CacheError("backend down".into()))
            }
            fn set(&self, _: &str, _: &str) -> Result<(), crate::cache::CacheError> {
                Err(crate::cache::CacheError("backend down".into()))
            }
            fn flush(&self) -> Result<(), crate::cache::CacheError> {
                Err(crate::cache::CacheError("backend down".into()))
            }
        }

        let aside = CacheAside::new(Arc::new(BrokenCache));
        let value = aside
            .get_or_build("k", || async { Ok("computed".to_string()) })
            .await
            .unwrap();
        assert_eq!(value, "computed");
        aside.invalidate();
    }
}
