//! Cache façade and shard routing.
//!
//! The façade hashes a key, selects a shard by bitmask, and dispatches
//! the operation. A power-of-two shard count gives uniform dispersion;
//! other counts work but bias toward low shard indices.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::counter::EntryCounter;
use crate::error::Result;
use crate::key::CacheKey;
use crate::metrics::{CacheMetrics, MetricsSnapshot};
use crate::reclaimer::Reclaimer;
use crate::shard::Shard;

/// The shards plus the routing mask, shared between the façade and the
/// reclaimer.
pub(crate) struct ShardSet<K, V> {
    shards: Vec<Shard<K, V>>,
    /// `shard_count - 1`
    mask: u64,
}

impl<K, V> ShardSet<K, V>
where
    K: CacheKey,
    V: Clone,
{
    pub(crate) fn new(shards: Vec<Shard<K, V>>) -> Self {
        let mask = shards.len() as u64 - 1;
        Self { shards, mask }
    }

    /// Routes a key to its shard. The hash is evaluated for every shard
    /// count, so unroutable keys are rejected uniformly.
    pub(crate) fn shard_for(&self, key: &K) -> Result<&Shard<K, V>> {
        let hash = key.route_hash()?;
        Ok(&self.shards[(hash & self.mask) as usize])
    }

    /// Routed delete; an unroutable key reports no deletion.
    pub(crate) fn del(&self, key: &K) -> bool {
        match self.shard_for(key) {
            Ok(shard) => shard.del(key),
            Err(_) => false,
        }
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, Shard<K, V>> {
        self.shards.iter()
    }
}

/// Sharded in-memory cache with approximate-LRU eviction.
///
/// Built via [`Builder`](crate::Builder). Any number of threads may call
/// the accessors concurrently; one background reclaimer converges the
/// entry count back under the limit after overflows.
pub struct Cache<K, V> {
    shards: Arc<ShardSet<K, V>>,
    counter: Arc<EntryCounter>,
    metrics: Arc<CacheMetrics>,
    reclaimer: Reclaimer,
}

impl<K, V> Cache<K, V>
where
    K: CacheKey,
    V: Clone + Send + Sync + 'static,
{
    pub(crate) fn assemble(
        shards: Arc<ShardSet<K, V>>,
        counter: Arc<EntryCounter>,
        metrics: Arc<CacheMetrics>,
        reclaimer: Reclaimer,
    ) -> Self {
        Self {
            shards,
            counter,
            metrics,
            reclaimer,
        }
    }

    /// Stores a value with the default lifetime.
    ///
    /// A key that cannot be routed drops the write.
    pub fn set(&self, key: K, value: V) {
        match self.shards.shard_for(&key) {
            Ok(shard) => shard.set(key, value),
            Err(err) => warn!(%err, "write dropped: key cannot be routed"),
        }
    }

    /// Stores a value with an explicit lifetime; a zero `ttl` falls back
    /// to the configured default.
    pub fn set_exp(&self, key: K, value: V, ttl: Duration) {
        match self.shards.shard_for(&key) {
            Ok(shard) => shard.set_exp(key, value, ttl),
            Err(err) => warn!(%err, "write dropped: key cannot be routed"),
        }
    }

    /// Returns the cached value, invoking the loader on a miss when one
    /// is configured.
    pub fn get(&self, key: &K) -> Result<V> {
        self.shards.shard_for(key)?.get(key)
    }

    /// Deletes a key. Reports whether an entry was removed.
    pub fn del(&self, key: &K) -> bool {
        self.shards.del(key)
    }

    /// Global live-entry count.
    ///
    /// May transiently exceed the number of mapped entries while writers
    /// race the reclaimer, and counts overwrites until reclaimed.
    pub fn count(&self) -> i64 {
        self.counter.count()
    }

    /// Per-shard entry counts, in shard order. Useful for checking key
    /// dispersion.
    pub fn shard_counts(&self) -> Vec<usize> {
        self.shards.iter().map(|shard| shard.len()).collect()
    }

    /// Point-in-time metrics snapshot.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Stops the background reclaimer and joins it. Idempotent; the
    /// cache must not be used after closing.
    pub fn close(&self) {
        self.reclaimer.stop();
    }
}

impl<K, V> Drop for Cache<K, V> {
    fn drop(&mut self) {
        self.reclaimer.stop();
    }
}

impl<K, V> std::fmt::Debug for Cache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("shards", &self.shards.shards.len())
            .field("count", &self.counter.count())
            .field("limit", &self.counter.limit())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
