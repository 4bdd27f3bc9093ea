//! Worker: drains one ring into one engine.
//!
//! Each worker owns its engine outright, so the whole book mutation path is
//! single-threaded. The only shared state it touches are the ring, the done
//! flag, and the stats counters.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::{BATCH_SIZE, MAX_ORDERS, MAX_TICKS, STATS_FLUSH_EVERY};
use crate::engine::{AddOutcome, MatchingEngine};
use crate::message::{MsgType, OrderMsg};
use crate::ring::RingQueue;
use crate::stats::Stats;

/// Final per-worker accounting, returned when the thread joins.
#[derive(Clone, Copy, Debug)]
pub struct WorkerReport {
    pub id: usize,
    pub processed: u64,
    pub trades: u64,
    pub volume: u64,
    pub live_orders: u32,
    pub best_bid: Option<u32>,
    pub best_ask: Option<u32>,
}

#[derive(Default)]
struct LocalCounters {
    popped: u64,
    filled: u64,
    resting: u64,
    cancelled: u64,
    rejected: u64,
}

impl LocalCounters {
    fn flush(&mut self, stats: &Stats) {
        stats.add_popped(self.popped);
        stats.add_filled(self.filled);
        stats.add_resting(self.resting);
        stats.add_cancelled(self.cancelled);
        stats.add_rejected(self.rejected);
        *self = Self::default();
    }
}

pub struct MatchingWorker {
    id: usize,
    ring: Arc<RingQueue<OrderMsg>>,
    done: Arc<AtomicBool>,
    stats: Arc<Stats>,
    engine: MatchingEngine,
    /// Producer-side synthetic handle -> engine handle, stamped when an add
    /// rests. Cancels arrive with synthetic handles only.
    handle_map: FxHashMap<u32, u32>,
}

impl MatchingWorker {
    pub fn new(
        id: usize,
        ring: Arc<RingQueue<OrderMsg>>,
        done: Arc<AtomicBool>,
        stats: Arc<Stats>,
    ) -> Self {
        Self {
            id,
            ring,
            done,
            stats,
            engine: MatchingEngine::new(MAX_TICKS, MAX_ORDERS),
            handle_map: FxHashMap::default(),
        }
    }

    /// Test/bench hook: build a worker with a small engine.
    pub fn with_engine(
        id: usize,
        ring: Arc<RingQueue<OrderMsg>>,
        done: Arc<AtomicBool>,
        stats: Arc<Stats>,
        engine: MatchingEngine,
    ) -> Self {
        Self {
            id,
            ring,
            done,
            stats,
            engine,
            handle_map: FxHashMap::default(),
        }
    }

    /// Thread entry: drain until the producer is done and the ring is empty.
    pub fn run(mut self) -> WorkerReport {
        let mut batch = vec![OrderMsg::default(); BATCH_SIZE];
        let mut local = LocalCounters::default();
        let mut processed = 0u64;
        let mut batches = 0u64;

        loop {
            if self.done.load(Ordering::Acquire) && self.ring.is_empty() {
                break;
            }

            let n = self.ring.pop_batch(&mut batch);
            if n == 0 {
                if self.done.load(Ordering::Acquire) && self.ring.is_empty() {
                    break;
                }
                std::hint::spin_loop();
                continue;
            }
            batches += 1;

            for msg in &batch[..n] {
                local.popped += 1;
                processed += 1;
                self.dispatch(msg, &mut local);
            }

            if local.popped >= STATS_FLUSH_EVERY {
                local.flush(&self.stats);
            }
        }

        local.flush(&self.stats);

        debug!(
            worker = self.id,
            processed,
            batches,
            trades = self.engine.total_trades(),
            "worker drained and exiting"
        );

        WorkerReport {
            id: self.id,
            processed,
            trades: self.engine.total_trades(),
            volume: self.engine.total_volume(),
            live_orders: self.engine.live_orders(),
            best_bid: self.engine.best_bid(),
            best_ask: self.engine.best_ask(),
        }
    }

    #[inline]
    fn dispatch(&mut self, msg: &OrderMsg, local: &mut LocalCounters) {
        match msg.msg_type {
            MsgType::Add => match self.engine.add_limit(msg) {
                AddOutcome::Filled => local.filled += 1,
                AddOutcome::Resting(handle) => {
                    local.resting += 1;
                    self.handle_map.insert(msg.client_id as u32, handle);
                }
                AddOutcome::Rejected => local.rejected += 1,
            },
            MsgType::Cancel => {
                // A miss means the order was consumed before the cancel
                // arrived; that is expected, not an error.
                if let Some(handle) = self.handle_map.remove(&msg.handle_to_cancel) {
                    if self.engine.cancel(handle) {
                        local.cancelled += 1;
                    }
                }
            }
        }
    }
}
