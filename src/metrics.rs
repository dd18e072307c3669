//! Cache metrics collection.
//!
//! Lightweight atomic counters for monitoring cache health: hit ratio,
//! loader activity, reclaim behavior, and overflow-signal flow. All
//! recording is relaxed atomics on the hot path.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Cache metrics collector
#[derive(Debug, Default)]
pub struct CacheMetrics {
    // Read path
    hits: AtomicU64,
    misses: AtomicU64,

    // Loader
    loads: AtomicU64,
    load_failures: AtomicU64,

    // Reclaimer
    expired_removed: AtomicU64,
    evicted: AtomicU64,
    reclaim_rounds: AtomicU64,
    rounds_coalesced: AtomicU64,

    // Overflow signaling
    overflow_signals: AtomicU64,
    signals_dropped: AtomicU64,
}

impl CacheMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    // Read path
    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    // Loader
    pub(crate) fn record_load(&self) {
        self.loads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_load_failure(&self) {
        self.load_failures.fetch_add(1, Ordering::Relaxed);
    }

    // Reclaimer
    pub(crate) fn record_expired_removed(&self, n: u64) {
        self.expired_removed.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn record_evicted(&self, n: u64) {
        self.evicted.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn record_reclaim_round(&self) {
        self.reclaim_rounds.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_round_coalesced(&self) {
        self.rounds_coalesced.fetch_add(1, Ordering::Relaxed);
    }

    // Overflow signaling
    pub(crate) fn record_overflow_signal(&self) {
        self.overflow_signals.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_signal_dropped(&self) {
        self.signals_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Lookup hits so far
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Lookup misses so far
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Hit ratio (0.0 - 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Overflow signals emitted by writers
    pub fn overflow_signals(&self) -> u64 {
        self.overflow_signals.load(Ordering::Relaxed)
    }

    /// Get a point-in-time snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            loads: self.loads.load(Ordering::Relaxed),
            load_failures: self.load_failures.load(Ordering::Relaxed),
            expired_removed: self.expired_removed.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            reclaim_rounds: self.reclaim_rounds.load(Ordering::Relaxed),
            rounds_coalesced: self.rounds_coalesced.load(Ordering::Relaxed),
            overflow_signals: self.overflow_signals.load(Ordering::Relaxed),
            signals_dropped: self.signals_dropped.load(Ordering::Relaxed),
            hit_ratio: self.hit_ratio(),
        }
    }
}

/// Point-in-time view of the cache counters
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Lookup hits
    pub hits: u64,
    /// Lookup misses
    pub misses: u64,
    /// Successful loader invocations
    pub loads: u64,
    /// Failed loader invocations
    pub load_failures: u64,
    /// Entries removed because they had expired
    pub expired_removed: u64,
    /// Entries removed by cold-candidate eviction
    pub evicted: u64,
    /// Reclaim rounds that executed a scan
    pub reclaim_rounds: u64,
    /// Overflow signals absorbed by a previous round's removals
    pub rounds_coalesced: u64,
    /// Overflow signals emitted by writers
    pub overflow_signals: u64,
    /// Overflow signals dropped because the queue was full
    pub signals_dropped: u64,
    /// Hit ratio (0.0 - 1.0)
    pub hit_ratio: f64,
}

// =============================================================================
// Tests
// =============================================================================
