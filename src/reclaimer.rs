//! Background reclaimer.
//!
//! A single long-lived thread consumes the bounded overflow channel. Each
//! un-absorbed signal triggers one round: scan every shard, delete the
//! expired keys, and only when nothing expired, delete the cold sample
//! drained from the selector. Removals from one round absorb subsequent
//! signals one-for-one, so a burst of writers collapses into a handful of
//! rounds instead of a thundering herd.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::cache::ShardSet;
use crate::key::CacheKey;
use crate::metrics::CacheMetrics;
use crate::selector::EpochSelector;
use crate::EXPIRED_SCAN_CAPACITY;

/// Handle to the reclaimer thread.
pub(crate) struct Reclaimer {
    shutdown_tx: Sender<()>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Reclaimer {
    /// Starts the reclaimer thread for the given shard set.
    pub(crate) fn spawn<K, V>(
        shards: Arc<ShardSet<K, V>>,
        overflow_rx: Receiver<()>,
        items_to_prune: usize,
        metrics: Arc<CacheMetrics>,
    ) -> Self
    where
        K: CacheKey,
        V: Clone + Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("shardcache-reclaimer".to_string())
            .spawn(move || run_loop(shards, overflow_rx, shutdown_rx, items_to_prune, metrics))
            .expect("failed to spawn reclaimer thread");
        Self {
            shutdown_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Signals the loop to stop and joins it. Safe to call repeatedly.
    pub(crate) fn stop(&self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

fn run_loop<K, V>(
    shards: Arc<ShardSet<K, V>>,
    overflow_rx: Receiver<()>,
    shutdown_rx: Receiver<()>,
    items_to_prune: usize,
    metrics: Arc<CacheMetrics>,
) where
    K: CacheKey,
    V: Clone + Send + Sync + 'static,
{
    let mut removed: usize = 0;
    let mut expired: Vec<K> = Vec::with_capacity(EXPIRED_SCAN_CAPACITY);
    let mut oldest = EpochSelector::new(items_to_prune);

    loop {
        select! {
            recv(shutdown_rx) -> _ => return,
            recv(overflow_rx) -> msg => {
                if msg.is_err() {
                    // Every shard is gone; nothing left to reclaim.
                    return;
                }
            }
        }

        if removed > 0 {
            // A previous round already freed an entry for this signal.
            removed -= 1;
            metrics.record_round_coalesced();
            trace!("overflow signal absorbed by previous round");
            continue;
        }

        oldest.clear();
        let mut swept: usize = 0;
        for shard in shards.iter() {
            expired.clear();
            shard.collect_reclaimable(&mut expired, &mut oldest);
            for key in expired.iter() {
                if shards.del(key) {
                    removed += 1;
                    swept += 1;
                }
            }
        }
        metrics.record_expired_removed(swept as u64);

        // Cold eviction only when the expired sweep freed nothing.
        let mut cold: usize = 0;
        if removed == 0 {
            while let Some(key) = oldest.next() {
                if shards.del(&key) {
                    cold += 1;
                }
                removed += 1;
            }
            metrics.record_evicted(cold as u64);
        }
        metrics.record_reclaim_round();
        debug!(swept, cold, "reclaim round completed");
    }
}
