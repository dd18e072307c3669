//! shardcache - Sharded In-Memory Approximate-LRU Cache
//!
//! A bounded in-memory cache with optional per-entry TTL and an optional
//! loader-on-miss. Entries live in independently locked shards; when the
//! global entry count exceeds its limit, a single background reclaimer
//! deletes expired entries first and then the approximately coldest ones.
//!
//! # Architecture
//!
//! ```text
//!  writers/readers
//!        │
//!        ▼
//!  ┌───────────┐  route_hash & mask   ┌──────────────────────────┐
//!  │   Cache   │ ───────────────────▶ │ Shard (RwLock<HashMap>)  │
//!  │ (router)  │                      │  entry: value, expiry,   │
//!  └───────────┘                      │  atomic cost cell        │
//!                                     └───────────┬──────────────┘
//!                                  counter.inc()  │ overflow
//!                                                 ▼
//!                            bounded signal queue (full ⇒ drop)
//!                                                 │
//!                                                 ▼
//!  ┌───────────────────────── Reclaimer thread ─────────────────────────┐
//!  │ per-shard scan ──▶ expired keys deleted                            │
//!  │              └───▶ EpochSelector (two-epoch cold sample) ─▶ delete │
//!  └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - Recency is a wrapping 32-bit logical clock; touches are atomic
//!   stores, never writes under the shard lock
//! - Eviction is approximate: a bounded cold sample per round, validated
//!   against concurrent touches before deletion
//! - Overflow signals coalesce: a full queue drops the signal, and one
//!   round's removals absorb queued signals one-for-one
//! - The loader runs under the shard write lock, so concurrent misses
//!   for a key collapse into one load
//!
//! # Modules
//!
//! - `builder` - Configuration and construction
//! - `cache` - Public façade and shard routing
//! - [`error`] - Error types
//! - `key` - Key capability (dispersion hashing)
//! - `metrics` - Cache health counters

mod builder;
mod cache;
mod clock;
mod counter;
mod entry;
pub mod error;
mod key;
mod metrics;
mod reclaimer;
mod selector;
mod shard;

pub use builder::{Builder, Config, Kind};
pub use cache::Cache;
pub use error::{Error, Result};
pub use key::CacheKey;
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use shard::Loader;

/// Cold candidates targeted per epoch per reclaim round when the builder
/// leaves `items_to_prune` unset.
pub const DEFAULT_ITEMS_TO_PRUNE: u32 = 10;

/// Pre-allocated capacity of the reclaimer's expired-key scratch vector.
pub const EXPIRED_SCAN_CAPACITY: usize = 10_000;

/// Lower bound on the overflow-signal queue capacity; large caches grow
/// it to a tenth of the entry limit.
pub const MIN_SIGNAL_QUEUE_CAPACITY: usize = 1_000;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_queue_floor() {
        // Small caches share one floor; a 100k-entry cache gets 10k slots.
        assert_eq!(MIN_SIGNAL_QUEUE_CAPACITY.max(500 / 10), 1_000);
        assert_eq!(MIN_SIGNAL_QUEUE_CAPACITY.max(100_000 / 10), 10_000);
    }

    #[test]
    fn test_default_items_to_prune() {
        assert_eq!(DEFAULT_ITEMS_TO_PRUNE, 10);
    }
}
