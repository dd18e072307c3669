//! Construction surface.
//!
//! The builder validates the configuration, allocates the shared pieces
//! (counter, tick clock, overflow queue, metrics), creates the shards,
//! and starts the background reclaimer.

use std::sync::Arc;

use chrono::Duration;
use crossbeam_channel::bounded;
use serde::{Deserialize, Serialize};

use crate::cache::{Cache, ShardSet};
use crate::clock::TickClock;
use crate::counter::EntryCounter;
use crate::error::{Error, Result};
use crate::key::CacheKey;
use crate::metrics::CacheMetrics;
use crate::reclaimer::Reclaimer;
use crate::shard::{Loader, Shard};
use crate::{DEFAULT_ITEMS_TO_PRUNE, MIN_SIGNAL_QUEUE_CAPACITY};

/// Eviction policy selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kind {
    /// No policy chosen; construction rejects this.
    #[default]
    Unknown,
    /// Approximate least-recently-used.
    Lru,
}

/// Cache configuration.
///
/// The default lifetime is a signed [`chrono::Duration`] so an invalid
/// negative value is representable and rejected at build time.
#[derive(Debug, Clone)]
pub struct Config {
    /// Eviction policy.
    pub kind: Kind,
    /// Default per-entry lifetime; zero means no default expiry.
    pub ttl: Duration,
    /// Global entry capacity.
    pub max_size: i64,
    /// Number of shards; dispersion is best with a power of two.
    pub shards: i64,
    /// Cold candidates targeted per epoch per reclaim round; 0 picks the
    /// default.
    pub items_to_prune: u32,
}

/// Fluent builder for [`Cache`].
///
/// ```
/// use shardcache::Builder;
///
/// let cache = Builder::<String, String>::new(4, 1000).lru().build().unwrap();
/// cache.set("greeting".to_string(), "hello".to_string());
/// assert_eq!(cache.get(&"greeting".to_string()).unwrap(), "hello");
/// cache.close();
/// ```
pub struct Builder<K, V> {
    config: Config,
    loader: Option<Loader<K, V>>,
}

impl<K, V> Builder<K, V>
where
    K: CacheKey,
    V: Clone + Send + Sync + 'static,
{
    /// Starts a builder with the two required capacities.
    pub fn new(shards: i64, max_size: i64) -> Self {
        Self {
            config: Config {
                kind: Kind::Unknown,
                ttl: Duration::zero(),
                max_size,
                shards,
                items_to_prune: 0,
            },
            loader: None,
        }
    }

    /// Starts a builder from a prepared configuration.
    pub fn from_config(config: Config) -> Self {
        Self {
            config,
            loader: None,
        }
    }

    /// Selects the approximate-LRU eviction policy.
    pub fn lru(mut self) -> Self {
        self.config.kind = Kind::Lru;
        self
    }

    /// Sets the default per-entry lifetime.
    pub fn ttl(mut self, val: Duration) -> Self {
        self.config.ttl = val;
        self
    }

    /// Sets the loader invoked on lookup misses. The loader runs under
    /// the owning shard's write lock (single-flight per shard).
    pub fn loader<F>(mut self, f: F) -> Self
    where
        F: Fn(&K) -> Result<V> + Send + Sync + 'static,
    {
        self.loader = Some(Arc::new(f));
        self
    }

    /// Sets the number of cold candidates targeted per epoch per reclaim
    /// round.
    pub fn items_to_prune(mut self, val: u32) -> Self {
        self.config.items_to_prune = val;
        self
    }

    /// Validates the configuration and starts the cache, including its
    /// background reclaimer.
    pub fn build(self) -> Result<Cache<K, V>> {
        let Config {
            kind,
            ttl,
            max_size,
            shards,
            items_to_prune,
        } = self.config;

        if shards <= 0 || shards >= u32::MAX as i64 {
            return Err(Error::InvalidShardCount);
        }
        if max_size <= 0 {
            return Err(Error::InvalidMaxSize);
        }
        if ttl < Duration::zero() {
            return Err(Error::InvalidTtl);
        }
        if kind != Kind::Lru {
            return Err(Error::InvalidKind);
        }

        let items_to_prune = if items_to_prune > 0 {
            items_to_prune
        } else {
            DEFAULT_ITEMS_TO_PRUNE
        };

        let counter = Arc::new(EntryCounter::new(max_size));
        let clock = Arc::new(TickClock::new());
        let metrics = Arc::new(CacheMetrics::new());

        let queue_capacity = MIN_SIGNAL_QUEUE_CAPACITY.max(counter.limit() as usize / 10);
        let (overflow_tx, overflow_rx) = bounded(queue_capacity);

        let default_ttl = ttl.to_std().unwrap_or_default();
        let loader = self.loader;
        let shard_vec: Vec<Shard<K, V>> = (0..shards)
            .map(|_| {
                Shard::new(
                    default_ttl,
                    Arc::clone(&counter),
                    Arc::clone(&clock),
                    loader.clone(),
                    overflow_tx.clone(),
                    Arc::clone(&metrics),
                )
            })
            .collect();

        let shard_set = Arc::new(ShardSet::new(shard_vec));
        let reclaimer = Reclaimer::spawn(
            Arc::clone(&shard_set),
            overflow_rx,
            items_to_prune as usize,
            Arc::clone(&metrics),
        );

        Ok(Cache::assemble(shard_set, counter, metrics, reclaimer))
    }
}

// =============================================================================
// Tests
// =============================================================================
