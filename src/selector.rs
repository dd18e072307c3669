//! Cold-candidate selection across tick epochs.
//!
//! # Epochs
//!
//! The tick clock wraps modulo 2^32. At scan tick `T`, a cold entry's cost
//! sits either slightly below `T` (old within the current epoch) or above
//! `T` (touched before the counter wrapped, i.e. the previous epoch, which
//! makes it older than anything below `T`). The selector therefore keeps
//! two fixed-capacity lists ordered by cost and drains the previous epoch
//! first.
//!
//! # Validity
//!
//! A candidate records a snapshot of its entry's cost cell at sampling
//! time. Draining re-reads the cell: a mismatch means the entry was
//! touched after sampling, and the candidate is skipped instead of
//! evicted.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// A sampled eviction candidate.
struct Candidate<K> {
    key: K,
    cell: Arc<AtomicU32>,
    snapshot: u32,
}

/// Fixed-capacity list of candidates ordered by cost snapshot, ascending.
///
/// Insertion is a binary search plus shift, worst case O(capacity); the
/// capacity is `items_to_prune`, which is small.
struct RankedList<K> {
    slots: Vec<Candidate<K>>,
    limit: usize,
}

impl<K> RankedList<K> {
    fn new(limit: usize) -> Self {
        Self {
            slots: Vec::with_capacity(limit),
            limit,
        }
    }

    /// Inserts in cost order.
    ///
    /// Rejects the candidate when the list already holds `limit` colder
    /// ones, or when a candidate with the same snapshot is present (at
    /// most one candidate per cost value).
    fn offer(&mut self, candidate: Candidate<K>) {
        let idx = match self
            .slots
            .binary_search_by(|held| held.snapshot.cmp(&candidate.snapshot))
        {
            Ok(_) => return,
            Err(idx) => idx,
        };
        if self.slots.len() == self.limit {
            if idx == self.limit {
                return;
            }
            self.slots.pop();
        }
        self.slots.insert(idx, candidate);
    }

    fn pop_coldest(&mut self) -> Option<Candidate<K>> {
        if self.slots.is_empty() {
            None
        } else {
            Some(self.slots.remove(0))
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
    }
}

/// Approximation of the globally coldest sample across all shards.
///
/// Single-writer: only the reclaimer feeds and drains it, once per round.
pub(crate) struct EpochSelector<K> {
    /// Candidates with cost below the scan tick (current epoch).
    before: RankedList<K>,
    /// Candidates with cost above the scan tick (previous epoch).
    after: RankedList<K>,
}

impl<K> EpochSelector<K> {
    pub(crate) fn new(items_to_prune: usize) -> Self {
        Self {
            before: RankedList::new(items_to_prune),
            after: RankedList::new(items_to_prune),
        }
    }

    /// Offers one entry observed at scan tick `tick`.
    ///
    /// The cost is loaded from the shared cell here, so a touch that
    /// landed after the shard scan read the entry is already folded in.
    /// An entry whose cost equals the scan tick was touched during the
    /// scan and is ignored.
    pub(crate) fn add(&mut self, key: K, cell: &Arc<AtomicU32>, tick: u32) {
        let snapshot = cell.load(Ordering::Relaxed);
        if snapshot == tick {
            return;
        }
        let candidate = Candidate {
            key,
            cell: Arc::clone(cell),
            snapshot,
        };
        if snapshot < tick {
            self.before.offer(candidate);
        } else {
            self.after.offer(candidate);
        }
    }

    /// Yields the next still-valid candidate key, previous epoch first.
    pub(crate) fn next(&mut self) -> Option<K> {
        loop {
            let candidate = self
                .after
                .pop_coldest()
                .or_else(|| self.before.pop_coldest())?;
            if candidate.cell.load(Ordering::Relaxed) == candidate.snapshot {
                return Some(candidate.key);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        self.before.clear();
        self.after.clear();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.before.slots.len() + self.after.slots.len()
    }
}

// =============================================================================
// Tests
// =============================================================================
