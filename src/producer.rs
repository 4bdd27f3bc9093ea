//! Synthetic order stream.
//!
//! One generator thread fabricates the whole message stream on a seeded
//! PRNG, routes round-robin across the worker rings, and raises the shared
//! done flag exactly once after its last successful push.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::config::{Config, MAX_TICKS, SPIN_RETRIES_BEFORE_YIELD};
use crate::message::{OrderMsg, Side};
use crate::ring::RingQueue;
use crate::stats::Stats;

pub struct OrderGenerator {
    cfg: Config,
    rings: Vec<Arc<RingQueue<OrderMsg>>>,
    done: Arc<AtomicBool>,
    stats: Arc<Stats>,
}

impl OrderGenerator {
    pub fn new(
        cfg: Config,
        rings: Vec<Arc<RingQueue<OrderMsg>>>,
        done: Arc<AtomicBool>,
        stats: Arc<Stats>,
    ) -> Self {
        assert!(!rings.is_empty());
        Self {
            cfg,
            rings,
            done,
            stats,
        }
    }

    /// Thread entry: emit `num_orders` messages, then signal completion.
    pub fn run(self) {
        let mut rng = ChaCha8Rng::seed_from_u64(self.cfg.rng_seed);
        let mid = MAX_TICKS / 2;
        let span = self.cfg.span_ticks as i64;

        let mut cursor = 0usize;
        // Synthetic handles of adds routed to each worker, for cancel picks.
        let mut tracked: Vec<Vec<u32>> = vec![Vec::new(); self.rings.len()];

        let mut generated = 0u64;
        let mut pushed = 0u64;
        let mut last_report = 0u64;

        for i in 0..self.cfg.num_orders {
            let side = if rng.gen_range(0..2u32) == 0 {
                Side::Buy
            } else {
                Side::Sell
            };
            let qty = rng.gen_range(1..=self.cfg.max_qty);
            let off = rng.gen_range(-span..=span);
            let tick = (mid as i64 + off).clamp(1, MAX_TICKS as i64 - 2) as u32;

            let worker = cursor;
            cursor += 1;
            if cursor >= self.rings.len() {
                cursor = 0;
            }

            let inject_cancel = self.cfg.cancel_every > 0
                && i > 0
                && i % self.cfg.cancel_every == 0
                && !tracked[worker].is_empty();

            let msg = if inject_cancel {
                let list = &mut tracked[worker];
                let pick = (rng.next_u64() % list.len() as u64) as usize;
                let handle = list.swap_remove(pick);
                OrderMsg::cancel(i + 1, worker as u32, handle)
            } else {
                // The tracked handle is synthetic (derived from the message
                // sequence), not the engine's; the worker owns the mapping.
                tracked[worker].push((i + 1) as u32);
                OrderMsg::add(i + 1, worker as u32, side, tick, qty, 0)
            };

            generated += 1;

            let ring = &self.rings[worker];
            let mut retries = 0u32;
            while !ring.push(msg) {
                retries += 1;
                if retries < SPIN_RETRIES_BEFORE_YIELD {
                    std::hint::spin_loop();
                } else {
                    thread::yield_now();
                    retries = 0;
                    if generated - last_report >= 500_000 {
                        debug!(generated, pushed, worker, "ring full, backing off");
                        last_report = generated;
                    }
                }
            }
            pushed += 1;
        }

        self.stats.generated.store(generated, Ordering::Release);
        self.stats.pushed.store(pushed, Ordering::Release);

        debug!(generated, pushed, "generator finished");

        // Raised strictly after the last successful push; a worker that
        // sees this flag and an empty ring has seen every message.
        self.done.store(true, Ordering::Release);
    }
}
