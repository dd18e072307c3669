//! Shard: an independently locked partition of the keyspace.
//!
//! # Locking
//!
//! Mutations take the shard's write lock; lookups and the reclaim scan
//! take the read lock and touch entry internals only through atomics.
//! A configured loader runs under the write lock, so concurrent misses
//! for the same key collapse into a single load per shard.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::RwLock;

use crate::clock::TickClock;
use crate::counter::EntryCounter;
use crate::entry::{now_nanos, Entry};
use crate::error::{Error, Result};
use crate::metrics::CacheMetrics;
use crate::selector::EpochSelector;

/// Loader invoked on a lookup miss, under the owning shard's write lock.
///
/// Holding the lock for the duration of the call makes the loader a
/// single-flight barrier for that key within its shard.
pub type Loader<K, V> = Arc<dyn Fn(&K) -> Result<V> + Send + Sync>;

pub(crate) struct Shard<K, V> {
    map: RwLock<HashMap<K, Entry<V>>>,
    default_ttl: Duration,
    counter: Arc<EntryCounter>,
    clock: Arc<TickClock>,
    loader: Option<Loader<K, V>>,
    overflow_tx: Sender<()>,
    metrics: Arc<CacheMetrics>,
}

impl<K, V> Shard<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub(crate) fn new(
        default_ttl: Duration,
        counter: Arc<EntryCounter>,
        clock: Arc<TickClock>,
        loader: Option<Loader<K, V>>,
        overflow_tx: Sender<()>,
        metrics: Arc<CacheMetrics>,
    ) -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
            default_ttl,
            counter,
            clock,
            loader,
            overflow_tx,
            metrics,
        }
    }

    /// Number of live entries in this shard.
    pub(crate) fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Inserts with the shard's default lifetime.
    pub(crate) fn set(&self, key: K, value: V) {
        self.set_exp(key, value, Duration::ZERO);
    }

    /// Inserts with an explicit lifetime; zero falls back to the default.
    pub(crate) fn set_exp(&self, key: K, value: V, ttl: Duration) {
        let overflow = {
            let mut map = self.map.write();
            self.insert_locked(&mut map, key, value, ttl)
        };
        if overflow {
            self.signal_overflow();
        }
    }

    /// Looks up a key, touching its recency and honoring expiry. On a
    /// miss the configured loader runs; without one the lookup fails
    /// with [`Error::NotFound`].
    pub(crate) fn get(&self, key: &K) -> Result<V> {
        let mut expired = false;
        {
            let map = self.map.read();
            if let Some(entry) = map.get(key) {
                entry.touch(self.clock.tick());
                if entry.is_expired(now_nanos()) {
                    expired = true;
                } else {
                    self.metrics.record_hit();
                    return Ok(entry.value().clone());
                }
            }
        }
        if expired {
            self.del(key);
        }
        self.load_missing(key)
    }

    /// Removes a key. Reports whether an entry was actually deleted.
    pub(crate) fn del(&self, key: &K) -> bool {
        let mut map = self.map.write();
        if map.remove(key).is_some() {
            self.counter.dec();
            true
        } else {
            false
        }
    }

    /// Reclaim scan: splits the shard into expired keys and cold
    /// candidates under the read lock.
    ///
    /// Expired keys are appended only while `expired` has spare
    /// pre-allocated capacity; live keys keep flowing to the selector
    /// either way. An entry with no expiry carries instant 0 and sorts
    /// with the expired set here, so capacity pressure reclaims such
    /// entries first.
    pub(crate) fn collect_reclaimable(&self, expired: &mut Vec<K>, oldest: &mut EpochSelector<K>) {
        let now = now_nanos();
        // The scan moment: entries whose cost equals this tick were
        // touched during the scan and are never sampled.
        let tick = self.clock.value();
        let map = self.map.read();
        for (key, entry) in map.iter() {
            if entry.expire_at() <= now {
                if expired.len() < expired.capacity() {
                    expired.push(key.clone());
                }
            } else {
                oldest.add(key.clone(), entry.cost_cell(), tick);
            }
        }
    }

    /// Miss path: re-check under the write lock, then load and insert
    /// without re-locking.
    fn load_missing(&self, key: &K) -> Result<V> {
        let Some(loader) = &self.loader else {
            self.metrics.record_miss();
            return Err(Error::NotFound);
        };

        let (value, overflow) = {
            let mut map = self.map.write();
            if let Some(entry) = map.get(key) {
                // Another caller loaded it while we waited on the lock.
                self.metrics.record_hit();
                return Ok(entry.value().clone());
            }
            self.metrics.record_miss();
            match loader(key) {
                Ok(value) => {
                    self.metrics.record_load();
                    let overflow =
                        self.insert_locked(&mut map, key.clone(), value.clone(), Duration::ZERO);
                    (value, overflow)
                }
                Err(err) => {
                    self.metrics.record_load_failure();
                    return Err(err);
                }
            }
        };
        if overflow {
            self.signal_overflow();
        }
        Ok(value)
    }

    /// Insert path shared by writes and the loader; the caller holds the
    /// write lock. Returns whether the counter overflowed.
    ///
    /// A replaced entry is discarded without decrementing the counter;
    /// the count doubles as a write-pressure signal.
    fn insert_locked(&self, map: &mut HashMap<K, Entry<V>>, key: K, value: V, ttl: Duration) -> bool {
        let expire_at = self.expire_at(ttl);
        let cost = self.clock.tick();
        map.insert(key, Entry::new(value, expire_at, cost));
        self.counter.inc()
    }

    fn expire_at(&self, ttl: Duration) -> i64 {
        if !ttl.is_zero() {
            now_nanos() + ttl.as_nanos() as i64
        } else if !self.default_ttl.is_zero() {
            now_nanos() + self.default_ttl.as_nanos() as i64
        } else {
            0
        }
    }

    /// A full queue means a reclaim round is already pending; one pending
    /// signal is as good as many.
    fn signal_overflow(&self) {
        self.metrics.record_overflow_signal();
        if self.overflow_tx.try_send(()).is_err() {
            self.metrics.record_signal_dropped();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{bounded, Receiver};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    fn test_shard(
        limit: i64,
        default_ttl: Duration,
        loader: Option<Loader<String, String>>,
    ) -> (Shard<String, String>, Receiver<()>) {
        let (tx, rx) = bounded(16);
        let shard = Shard::new(
            default_ttl,
            Arc::new(EntryCounter::new(limit)),
            Arc::new(TickClock::new()),
            loader,
            tx,
            Arc::new(CacheMetrics::new()),
        );
        (shard, rx)
    }

    #[test]
    fn test_set_get_roundtrip() {
        let (shard, _rx) = test_shard(10, Duration::ZERO, None);
        shard.set("k".to_string(), "v".to_string());
        assert_eq!(shard.get(&"k".to_string()).unwrap(), "v");
        assert_eq!(shard.len(), 1);
    }

    #[test]
    fn test_get_missing_without_loader() {
        let (shard, _rx) = test_shard(10, Duration::ZERO, None);
        assert_eq!(shard.get(&"absent".to_string()), Err(Error::NotFound));
    }

    #[test]
    fn test_del_reports_presence() {
        let (shard, _rx) = test_shard(10, Duration::ZERO, None);
        shard.set("k".to_string(), "v".to_string());
        assert!(shard.del(&"k".to_string()));
        assert!(!shard.del(&"k".to_string()));
        assert_eq!(shard.len(), 0);
    }

    #[test]
    fn test_overwrite_replaces_value_and_still_increments() {
        let (shard, _rx) = test_shard(10, Duration::ZERO, None);
        shard.set("k".to_string(), "old".to_string());
        shard.set("k".to_string(), "new".to_string());
        assert_eq!(shard.get(&"k".to_string()).unwrap(), "new");
        assert_eq!(shard.len(), 1);
        assert_eq!(shard.counter.count(), 2);
    }

    #[test]
    fn test_overflow_signal_on_limit_breach() {
        let (shard, rx) = test_shard(2, Duration::ZERO, None);
        shard.set("a".to_string(), "1".to_string());
        shard.set("b".to_string(), "2".to_string());
        assert!(rx.try_recv().is_err());
        shard.set("c".to_string(), "3".to_string());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn test_default_ttl_expires_entries() {
        let (shard, _rx) = test_shard(10, Duration::from_millis(20), None);
        shard.set("k".to_string(), "v".to_string());
        assert_eq!(shard.get(&"k".to_string()).unwrap(), "v");

        thread::sleep(Duration::from_millis(40));
        assert_eq!(shard.get(&"k".to_string()), Err(Error::NotFound));
        // The expired lookup removed the entry.
        assert_eq!(shard.len(), 0);
        assert_eq!(shard.counter.count(), 0);
    }

    #[test]
    fn test_explicit_ttl_overrides_default() {
        let (shard, _rx) = test_shard(10, Duration::from_millis(5), None);
        shard.set_exp("k".to_string(), "v".to_string(), Duration::from_secs(3600));
        thread::sleep(Duration::from_millis(20));
        assert_eq!(shard.get(&"k".to_string()).unwrap(), "v");
    }

    #[test]
    fn test_loader_fills_on_miss_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let loader: Loader<String, String> = Arc::new(move |key: &String| {
            counted.fetch_add(1, Ordering::SeqCst);
            Ok(format!("loaded:{key}"))
        });
        let (shard, _rx) = test_shard(10, Duration::ZERO, Some(loader));

        assert_eq!(shard.get(&"k".to_string()).unwrap(), "loaded:k");
        assert_eq!(shard.get(&"k".to_string()).unwrap(), "loaded:k");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_loader_error_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let loader: Loader<String, String> = Arc::new(move |_key: &String| {
            counted.fetch_add(1, Ordering::SeqCst);
            Err(Error::Loader("failed to upload".to_string()))
        });
        let (shard, _rx) = test_shard(10, Duration::ZERO, Some(loader));

        for _ in 0..3 {
            assert_eq!(
                shard.get(&"k".to_string()),
                Err(Error::Loader("failed to upload".to_string()))
            );
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(shard.len(), 0);
    }

    #[test]
    fn test_scan_separates_expired_from_live() {
        let (shard, _rx) = test_shard(10, Duration::ZERO, None);
        shard.set_exp("live".to_string(), "v".to_string(), Duration::from_secs(3600));
        shard.set_exp("dead".to_string(), "v".to_string(), Duration::from_nanos(1));
        // No per-call and no default ttl: swept as expired under pressure.
        shard.set("never".to_string(), "v".to_string());
        thread::sleep(Duration::from_millis(5));

        let mut expired = Vec::with_capacity(16);
        let mut oldest = EpochSelector::new(4);
        shard.collect_reclaimable(&mut expired, &mut oldest);

        expired.sort();
        assert_eq!(expired, vec!["dead".to_string(), "never".to_string()]);
        assert_eq!(oldest.next(), Some("live".to_string()));
        assert_eq!(oldest.next(), None);
    }

    #[test]
    fn test_scan_respects_expired_capacity() {
        let (shard, _rx) = test_shard(100, Duration::ZERO, None);
        shard.set_exp("live".to_string(), "v".to_string(), Duration::from_secs(3600));
        for i in 0..8 {
            shard.set(format!("k{i}"), "v".to_string());
        }

        let mut expired = Vec::with_capacity(4);
        let mut oldest = EpochSelector::new(4);
        shard.collect_reclaimable(&mut expired, &mut oldest);

        // Collection stops at capacity, live keys still reach the selector.
        assert_eq!(expired.len(), expired.capacity());
        assert_eq!(oldest.next(), Some("live".to_string()));
    }

    #[test]
    fn test_concurrent_set_get() {
        let (shard, _rx) = test_shard(1_000_000, Duration::ZERO, None);
        let shard = Arc::new(shard);

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let shard = Arc::clone(&shard);
                thread::spawn(move || {
                    for i in 0..500 {
                        let key = format!("key-{t}-{i}");
                        shard.set(key.clone(), i.to_string());
                        assert_eq!(shard.get(&key).unwrap(), i.to_string());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(shard.len(), 4000);
    }
}
