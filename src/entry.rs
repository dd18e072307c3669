//! Cache entry internals.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single cached value with its expiry and recency bookkeeping.
///
/// The cost cell holds the tick at which the entry was last touched. The
/// cell is shared by identity with the eviction selector, which snapshots
/// it during a scan and re-reads it before deleting; its address stays
/// stable for the entry's lifetime, and only atomic stores mutate it.
pub(crate) struct Entry<V> {
    value: V,
    /// Absolute expiry instant in unix nanoseconds; 0 means no expiry.
    expire_at: i64,
    cost: Arc<AtomicU32>,
}

impl<V> Entry<V> {
    pub(crate) fn new(value: V, expire_at: i64, cost: u32) -> Self {
        Self {
            value,
            expire_at,
            cost: Arc::new(AtomicU32::new(cost)),
        }
    }

    #[inline]
    pub(crate) fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub(crate) fn expire_at(&self) -> i64 {
        self.expire_at
    }

    #[inline]
    pub(crate) fn cost_cell(&self) -> &Arc<AtomicU32> {
        &self.cost
    }

    /// Records a touch without taking the shard's write lock.
    #[inline]
    pub(crate) fn touch(&self, tick: u32) {
        self.cost.store(tick, Ordering::Relaxed);
    }

    /// Expiry check used by the read path: an entry with no expiry never
    /// expires here. The reclaim scan applies the broader
    /// `expire_at <= now` predicate instead.
    #[inline]
    pub(crate) fn is_expired(&self, now: i64) -> bool {
        self.expire_at != 0 && self.expire_at < now
    }
}

/// Current wall clock in unix nanoseconds.
#[inline]
pub(crate) fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as i64
}

// =============================================================================
// Tests
// =============================================================================
