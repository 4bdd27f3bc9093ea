//! Randomized engine workload checked against a naive reference book.
//!
//! The reference keeps FIFO queues in BTreeMaps and matches the slow,
//! obviously-correct way; the engine must agree on best prices, depth,
//! traded volume, and live order counts after every operation. Full
//! invariant walks run periodically.

use std::collections::BTreeMap;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use tickmatch::{AddOutcome, MatchingEngine, OrderMsg, Side};

const TICKS: u32 = 32_768;

/// Slow-but-straightforward book: tick -> FIFO of (key, qty).
struct ReferenceBook {
    bids: BTreeMap<u32, Vec<(u64, u32)>>,
    asks: BTreeMap<u32, Vec<(u64, u32)>>,
    volume: u64,
}

impl ReferenceBook {
    fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            volume: 0,
        }
    }

    fn best_bid(&self) -> Option<u32> {
        self.bids.keys().next_back().copied()
    }

    fn best_ask(&self) -> Option<u32> {
        self.asks.keys().next().copied()
    }

    fn depth(&self, side: Side, tick: u32) -> u64 {
        let book = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        book.get(&tick)
            .map(|v| v.iter().map(|&(_, q)| q as u64).sum())
            .unwrap_or(0)
    }

    fn live_orders(&self) -> usize {
        self.bids.values().map(Vec::len).sum::<usize>()
            + self.asks.values().map(Vec::len).sum::<usize>()
    }

    /// Match then rest; returns true when a remainder rested under `key`.
    fn place(&mut self, key: u64, side: Side, tick: u32, mut qty: u32) -> bool {
        loop {
            let best = match side {
                Side::Buy => match self.best_ask() {
                    Some(t) if t <= tick && qty > 0 => t,
                    _ => break,
                },
                Side::Sell => match self.best_bid() {
                    Some(t) if t >= tick && qty > 0 => t,
                    _ => break,
                },
            };
            let opposite = match side {
                Side::Buy => &mut self.asks,
                Side::Sell => &mut self.bids,
            };
            let level = opposite.get_mut(&best).unwrap();
            while qty > 0 && !level.is_empty() {
                let trade = level[0].1.min(qty);
                level[0].1 -= trade;
                qty -= trade;
                self.volume += trade as u64;
                if level[0].1 == 0 {
                    level.remove(0);
                }
            }
            if level.is_empty() {
                opposite.remove(&best);
            }
        }

        if qty > 0 {
            let own = match side {
                Side::Buy => &mut self.bids,
                Side::Sell => &mut self.asks,
            };
            own.entry(tick).or_default().push((key, qty));
            return true;
        }
        false
    }

    /// Remove by key wherever it rests. Returns true on hit.
    fn cancel(&mut self, key: u64) -> bool {
        for book in [&mut self.bids, &mut self.asks] {
            let found = book.iter().find_map(|(&tick, level)| {
                level
                    .iter()
                    .position(|&(k, _)| k == key)
                    .map(|pos| (tick, pos))
            });
            if let Some((tick, pos)) = found {
                let level = book.get_mut(&tick).unwrap();
                level.remove(pos);
                if level.is_empty() {
                    book.remove(&tick);
                }
                return true;
            }
        }
        false
    }
}

fn assert_books_agree(engine: &MatchingEngine, reference: &ReferenceBook, op: usize) {
    assert_eq!(engine.best_bid(), reference.best_bid(), "best bid at op {op}");
    assert_eq!(engine.best_ask(), reference.best_ask(), "best ask at op {op}");
    assert_eq!(
        engine.total_volume(),
        reference.volume,
        "traded volume at op {op}"
    );
    assert_eq!(
        engine.live_orders() as usize,
        reference.live_orders(),
        "live orders at op {op}"
    );
    if let Some(tick) = engine.best_bid() {
        assert_eq!(
            engine.depth_at(Side::Buy, tick),
            reference.depth(Side::Buy, tick),
            "bid depth at op {op}"
        );
    }
    if let Some(tick) = engine.best_ask() {
        assert_eq!(
            engine.depth_at(Side::Sell, tick),
            reference.depth(Side::Sell, tick),
            "ask depth at op {op}"
        );
    }
}

fn run_workload(seed: u64, ops: usize, tick_lo: u32, tick_hi: u32) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut engine = MatchingEngine::new(TICKS, 100_000);
    let mut reference = ReferenceBook::new();

    // Orders resting in both books: (reference key, engine handle, side).
    let mut resting: Vec<(u64, u32, Side)> = Vec::new();
    let mut next_key = 1u64;

    for op in 0..ops {
        let roll = rng.gen_range(0..100);

        if roll < 60 || resting.is_empty() {
            // Place.
            let key = next_key;
            next_key += 1;
            let side = if rng.gen_bool(0.5) { Side::Buy } else { Side::Sell };
            let tick = rng.gen_range(tick_lo..=tick_hi);
            let qty = rng.gen_range(1..500);

            let outcome = engine.add_limit(&OrderMsg::add(key, 0, side, tick, qty, 0));
            let ref_rested = reference.place(key, side, tick, qty);

            match outcome {
                AddOutcome::Resting(handle) => {
                    assert!(ref_rested, "engine rested but reference filled at op {op}");
                    resting.push((key, handle, side));
                }
                AddOutcome::Filled => {
                    assert!(!ref_rested, "engine filled but reference rested at op {op}");
                }
                AddOutcome::Rejected => panic!("unexpected reject at op {op}"),
            }
        } else if roll < 85 {
            // Cancel a random tracked order. The engine may have consumed it
            // through matching already; then the reference has too, and both
            // must miss.
            let pos = rng.gen_range(0..resting.len());
            let (key, handle, _) = resting.swap_remove(pos);
            let engine_hit = engine.cancel(handle);
            let ref_hit = reference.cancel(key);
            assert_eq!(engine_hit, ref_hit, "cancel divergence for key {key} at op {op}");
        } else {
            // Replace a random tracked order: cancel + re-add on the old side.
            let pos = rng.gen_range(0..resting.len());
            let (key, handle, side) = resting.swap_remove(pos);
            let new_tick = rng.gen_range(tick_lo..=tick_hi);
            let new_qty = rng.gen_range(1..500);

            let outcome = engine.replace(handle, new_tick, new_qty);
            let ref_live = reference.cancel(key);

            if !ref_live {
                assert_eq!(
                    outcome,
                    AddOutcome::Rejected,
                    "replace of dead order must reject at op {op}"
                );
            } else {
                let key2 = next_key;
                next_key += 1;
                let ref_rested = reference.place(key2, side, new_tick, new_qty);
                match outcome {
                    AddOutcome::Resting(handle2) => {
                        assert!(ref_rested, "replace rest divergence at op {op}");
                        resting.push((key2, handle2, side));
                    }
                    AddOutcome::Filled => {
                        assert!(!ref_rested, "replace fill divergence at op {op}");
                    }
                    AddOutcome::Rejected => panic!("live replace rejected at op {op}"),
                }
            }
        }

        assert_books_agree(&engine, &reference, op);
        if op % 1_000 == 0 {
            engine.validate();
        }
    }

    engine.validate();
}

#[test]
fn test_fuzz_clustered_prices() {
    // Heavy crossing traffic in a narrow band.
    run_workload(0xDEAD_BEEF, 20_000, 16_350, 16_420);
}

#[test]
fn test_fuzz_wide_prices() {
    // Sparse book across many bitset words.
    run_workload(0xCAFE_BABE, 20_000, 1_000, 30_000);
}

#[test]
fn test_fuzz_multiple_seeds() {
    for seed in 0..5 {
        run_workload(seed, 4_000, 16_000, 16_100);
    }
}
