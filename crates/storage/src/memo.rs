//! Bounded, single-flight memo cache.
//!
//! Each key maps to a shared `OnceCell` slot. The first caller for a key runs
//! the loader; concurrent callers for the same key wait on that slot instead
//! of loading again. A failed load leaves the slot empty, so the next caller
//! retries. Once capacity is exceeded the least-recently-used filled slot is
//! evicted. Slots with a load in flight are never evicted, so the cache can
//! briefly hold more than `capacity` slots while loads run.

use std::future::Future;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use lru::LruCache;
use tokio::sync::{Mutex, OnceCell};

/// Statistics for a memo cache
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Loader runs that produced a value.
    pub loads: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Memo cache with at most one in-flight load per key.
pub struct SingleFlightCache<K, V> {
    slots: Mutex<LruCache<K, Arc<OnceCell<V>>>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    loads: AtomicU64,
}

impl<K, V> SingleFlightCache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        let size = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            slots: Mutex::new(LruCache::unbounded()),
            capacity: size.get(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            loads: AtomicU64::new(0),
        }
    }

    /// Return the memoized value for `key`, running `load` if there is none.
    ///
    /// Errors are returned to every caller waiting on this load and are not
    /// memoized.
    pub async fn get_or_try_load<E, F, Fut>(&self, key: K, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            match slots.get(&key) {
                Some(slot) => slot.clone(),
                None => {
                    let slot = Arc::new(OnceCell::new());
                    slots.push(key.clone(), slot.clone());
                    self.trim(&mut slots, &key);
                    slot
                }
            }
        };

        if let Some(value) = slot.get() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value.clone());
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let result = slot
            .get_or_try_init(|| async {
                let value = load().await?;
                self.loads.fetch_add(1, Ordering::Relaxed);
                Ok::<V, E>(value)
            })
            .await;

        match result {
            Ok(value) => {
                let value = value.clone();
                self.trim(&mut *self.slots.lock().await, &key);
                Ok(value)
            }
            Err(e) => {
                self.discard_empty(&key, &slot).await;
                Err(e)
            }
        }
    }

    /// Memoized value for `key`, without loading or touching recency.
    pub async fn peek(&self, key: &K) -> Option<V> {
        let slots = self.slots.lock().await;
        slots.peek(key).and_then(|slot| slot.get().cloned())
    }

    /// Evict least-recently-used filled slots, other than `keep`, until
    /// within capacity.
    fn trim(&self, slots: &mut LruCache<K, Arc<OnceCell<V>>>, keep: &K) {
        while slots.len() > self.capacity {
            let victim = slots
                .iter()
                .rev()
                .find(|(k, slot)| *k != keep && slot.initialized())
                .map(|(k, _)| k.clone());
            match victim {
                Some(k) => {
                    slots.pop(&k);
                }
                None => break,
            }
        }
    }

    /// Drop an empty slot left behind by a failed load.
    async fn discard_empty(&self, key: &K, slot: &Arc<OnceCell<V>>) {
        let mut slots = self.slots.lock().await;
        let stale = slots
            .peek(key)
            .map(|current| Arc::ptr_eq(current, slot) && !current.initialized())
            .unwrap_or(false);
        if stale {
            slots.pop(key);
        }
    }

    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let slots = self.slots.lock().await;
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            entries: slots.iter().filter(|(_, slot)| slot.initialized()).count(),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[tokio::test]
    async fn test_memoizes_success() {
        let cache: SingleFlightCache<&str, u32> = SingleFlightCache::new(4);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let v = cache
                .get_or_try_load("a", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(7)
                })
                .await
                .unwrap();
            assert_eq!(v, 7);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats().await;
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.loads, 1);
        assert_eq!(stats.entries, 1);
    }

    #[tokio::test]
    async fn test_failure_not_memoized() {
        let cache: SingleFlightCache<&str, u32> = SingleFlightCache::new(4);

        let first = cache
            .get_or_try_load("a", || async { Err::<u32, _>("down") })
            .await;
        assert_eq!(first, Err("down"));
        assert_eq!(cache.stats().await.entries, 0);

        let second = cache
            .get_or_try_load("a", || async { Ok::<_, &str>(1) })
            .await;
        assert_eq!(second, Ok(1));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_load() {
        let cache: Arc<SingleFlightCache<String, u32>> = Arc::new(SingleFlightCache::new(4));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                let calls = calls.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_try_load("k".to_string(), || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok::<_, String>(42)
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap(), Ok(42));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_lru_eviction() {
        let cache: SingleFlightCache<u32, u32> = SingleFlightCache::new(2);
        for k in 0..3 {
            cache
                .get_or_try_load(k, || async move { Ok::<_, ()>(k * 10) })
                .await
                .unwrap();
        }
        assert_eq!(cache.peek(&0).await, None);
        assert_eq!(cache.peek(&2).await, Some(20));
        assert_eq!(cache.stats().await.entries, 2);
    }

    #[tokio::test]
    async fn test_in_flight_load_survives_eviction_pressure() {
        let cache: Arc<SingleFlightCache<&'static str, u32>> = Arc::new(SingleFlightCache::new(1));
        let calls = Arc::new(AtomicUsize::new(0));
        let started = Arc::new(tokio::sync::Notify::new());
        let release = Arc::new(tokio::sync::Notify::new());

        let first = {
            let (cache, calls, started, release) =
                (cache.clone(), calls.clone(), started.clone(), release.clone());
            tokio::spawn(async move {
                cache
                    .get_or_try_load("a", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        started.notify_one();
                        release.notified().await;
                        Ok::<_, ()>(1)
                    })
                    .await
            })
        };
        started.notified().await;

        // Fills the only slot of capacity while "a" is still loading.
        assert_eq!(cache.get_or_try_load("b", || async { Ok::<_, ()>(2) }).await, Ok(2));

        let second = {
            let (cache, calls) = (cache.clone(), calls.clone());
            tokio::spawn(async move {
                cache
                    .get_or_try_load("a", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok::<_, ()>(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        release.notify_one();

        assert_eq!(first.await.unwrap(), Ok(1));
        assert_eq!(second.await.unwrap(), Ok(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let stats = cache.stats().await;
        assert_eq!(stats.entries, 1);
        assert_eq!(cache.peek(&"a").await, Some(1));
        assert_eq!(cache.peek(&"b").await, None);
    }

    #[test]
    fn test_clear_drops_entries() {
        let cache: SingleFlightCache<u32, u32> = SingleFlightCache::new(4);
        tokio_test::block_on(async {
            cache
                .get_or_try_load(1, || async { Ok::<_, ()>(1) })
                .await
                .unwrap();
            cache.clear().await;
            assert_eq!(cache.peek(&1).await, None);
            assert_eq!(cache.stats().await.entries, 0);
        });
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let cache: SingleFlightCache<u32, u32> = SingleFlightCache::new(0);
        assert_eq!(cache.capacity, 1);
    }

    #[test]
    fn test_hit_rate() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 75.0);
    }
}
