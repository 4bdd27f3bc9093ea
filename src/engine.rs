//! The matching engine: price-time priority over discrete ticks.
//!
//! Cross/rest split as usual: an incoming limit order first crosses against
//! the opposite ladder head-first, then any remainder rests at its tick.
//! All book state lives in fixed slabs owned by this struct; each engine is
//! driven by exactly one worker thread, so nothing here is atomic.

use crate::handle::HandleTable;
use crate::ladder::{PriceLadder, NO_PRICE};
use crate::message::{OrderMsg, Side, FLAG_IOC};
use crate::pool::{NodePool, NIL};

/// Result of `add_limit` / `replace`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddOutcome {
    /// Invalid order, IOC remainder, or pool exhaustion. Any partial fill
    /// that happened before an IOC reject is retained.
    Rejected,
    /// Fully executed against resting liquidity; nothing rested.
    Filled,
    /// Remainder rests in the book under this handle.
    Resting(u32),
}

impl AddOutcome {
    #[inline]
    pub const fn is_resting(&self) -> bool {
        matches!(self, AddOutcome::Resting(_))
    }
}

pub struct MatchingEngine {
    pool: NodePool,
    handles: HandleTable,
    bids: PriceLadder,
    asks: PriceLadder,
    max_ticks: u32,
    total_trades: u64,
    total_volume: u64,
}

impl MatchingEngine {
    pub fn new(max_ticks: u32, max_orders: u32) -> Self {
        Self {
            pool: NodePool::new(max_orders),
            handles: HandleTable::new(max_orders),
            bids: PriceLadder::new(Side::Buy, max_ticks),
            asks: PriceLadder::new(Side::Sell, max_ticks),
            max_ticks,
            total_trades: 0,
            total_volume: 0,
        }
    }

    /// Process a limit order.
    ///
    /// Rejects on zero quantity, out-of-range tick, an IOC remainder, or
    /// pool exhaustion when resting.
    pub fn add_limit(&mut self, msg: &OrderMsg) -> AddOutcome {
        if msg.qty == 0 || msg.price_tick >= self.max_ticks {
            return AddOutcome::Rejected;
        }

        let remaining = self.cross(msg.side, msg.price_tick, msg.qty);
        if remaining == 0 {
            return AddOutcome::Filled;
        }

        // FOK is advisory: a partial fill may already have happened, and
        // enforcing all-or-nothing would require a liquidity pre-scan
        // before matching.
        if msg.flags & FLAG_IOC != 0 {
            return AddOutcome::Rejected;
        }
        match self.enqueue_resting(msg.side, msg.price_tick, remaining) {
            Some(handle) => AddOutcome::Resting(handle),
            None => AddOutcome::Rejected,
        }
    }

    /// Cancel a resting order by engine handle. Returns `false` when the
    /// handle is out of range or no longer live.
    pub fn cancel(&mut self, handle: u32) -> bool {
        let idx = self.handles.get(handle);
        if idx == NIL {
            return false;
        }

        let Self {
            pool,
            handles,
            bids,
            asks,
            ..
        } = self;

        let (tick, qty, side) = {
            let n = pool.get(idx);
            (n.price_tick, n.qty, n.side)
        };
        let ladder = match side {
            Side::Buy => bids,
            Side::Sell => asks,
        };

        let lvl = ladder.level_mut(tick);
        let now_empty = lvl.unlink(pool, idx);
        lvl.total_qty = if now_empty {
            0
        } else {
            debug_assert!(lvl.total_qty >= qty as u64);
            lvl.total_qty - qty as u64
        };
        if now_empty {
            ladder.clear_level(tick);
        }

        handles.release(handle);
        pool.free(idx);
        true
    }

    /// Cancel `handle` and submit a fresh order at `new_tick`/`new_qty` on
    /// the old side. The replacement matches like any add, so it may fill
    /// immediately or come back under a new handle.
    pub fn replace(&mut self, handle: u32, new_tick: u32, new_qty: u32) -> AddOutcome {
        if new_qty == 0 || new_tick >= self.max_ticks {
            return AddOutcome::Rejected;
        }
        let idx = self.handles.get(handle);
        if idx == NIL {
            return AddOutcome::Rejected;
        }
        let side = self.pool.get(idx).side;
        self.cancel(handle);
        self.add_limit(&OrderMsg::add(0, 0, side, new_tick, new_qty, 0))
    }

    #[inline]
    pub fn best_bid(&self) -> Option<u32> {
        match self.bids.best() {
            NO_PRICE => None,
            tick => Some(tick),
        }
    }

    #[inline]
    pub fn best_ask(&self) -> Option<u32> {
        match self.asks.best() {
            NO_PRICE => None,
            tick => Some(tick),
        }
    }

    #[inline]
    pub fn total_trades(&self) -> u64 {
        self.total_trades
    }

    #[inline]
    pub fn total_volume(&self) -> u64 {
        self.total_volume
    }

    /// Number of currently resting orders.
    #[inline]
    pub fn live_orders(&self) -> u32 {
        self.pool.allocated()
    }

    /// Total resting quantity at one tick on one side.
    pub fn depth_at(&self, side: Side, tick: u32) -> u64 {
        let ladder = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        ladder.level(tick).total_qty
    }

    /// Pre-fault the node slab.
    pub fn warm_up(&mut self) {
        self.pool.warm_up();
    }

    /// Drop all book state and start from an empty book.
    pub fn reset(&mut self) {
        *self = Self::new(self.max_ticks, self.pool.capacity());
    }

    /// Match `qty` of an incoming `taker_side` order against the opposite
    /// ladder while its limit allows. Returns the unmatched remainder.
    fn cross(&mut self, taker_side: Side, limit_tick: u32, qty: u32) -> u32 {
        let Self {
            pool,
            handles,
            bids,
            asks,
            total_trades,
            total_volume,
            ..
        } = self;

        let ladder = match taker_side {
            Side::Buy => asks,
            Side::Sell => bids,
        };

        let mut remaining = qty;
        while remaining > 0 {
            let tick = ladder.best();
            if tick == NO_PRICE {
                break;
            }
            let crosses = match taker_side {
                Side::Buy => tick <= limit_tick,
                Side::Sell => tick >= limit_tick,
            };
            if !crosses {
                break;
            }

            // Drain the level head-first (strict time priority).
            loop {
                let head = ladder.level(tick).head;
                if remaining == 0 || head == NIL {
                    break;
                }
                let (maker_qty, maker_handle) = {
                    let n = pool.get(head);
                    (n.qty, n.engine_handle)
                };

                let trade = remaining.min(maker_qty);
                remaining -= trade;
                pool.get_mut(head).qty -= trade;
                let lvl = ladder.level_mut(tick);
                debug_assert!(lvl.total_qty >= trade as u64);
                lvl.total_qty -= trade as u64;

                *total_trades += 1;
                *total_volume += trade as u64;

                if trade == maker_qty {
                    ladder.level_mut(tick).unlink(pool, head);
                    handles.release(maker_handle);
                    pool.free(head);
                }
            }

            if ladder.level(tick).is_empty() {
                ladder.clear_level(tick);
            } else {
                // Liquidity remains at this tick: the taker ran out.
                break;
            }
        }
        remaining
    }

    /// Rest `qty` at `tick`: allocate a node, claim a handle, append to the
    /// level FIFO, and update occupancy/best. `None` when the pool is dry.
    fn enqueue_resting(&mut self, side: Side, tick: u32, qty: u32) -> Option<u32> {
        let Self {
            pool,
            handles,
            bids,
            asks,
            ..
        } = self;

        let idx = pool.alloc()?;
        let handle = handles.assign(idx);
        {
            let n = pool.get_mut(idx);
            n.engine_handle = handle;
            n.price_tick = tick;
            n.qty = qty;
            n.side = side;
        }

        let ladder = match side {
            Side::Buy => bids,
            Side::Sell => asks,
        };
        ladder.level_mut(tick).push_back(pool, idx);
        ladder.mark_occupied(tick);
        Some(handle)
    }

    /// Full-state consistency walk. Panics on any violated invariant; used
    /// by the fuzz and unit suites after mutation bursts.
    pub fn validate(&self) {
        // Every live handle points at a node that points back.
        let mut live_handles = 0u32;
        for h in 0..self.handles.capacity() {
            let idx = self.handles.get(h);
            if idx != NIL {
                live_handles += 1;
                assert_eq!(
                    self.pool.get(idx).engine_handle,
                    h,
                    "handle {h} and node {idx} disagree"
                );
            }
        }
        assert_eq!(live_handles, self.pool.allocated());
        assert_eq!(
            self.pool.allocated() + self.pool.free_list_len(),
            self.pool.capacity(),
            "pool slots leaked"
        );

        let mut linked = 0u32;
        for (side, ladder) in [(Side::Buy, &self.bids), (Side::Sell, &self.asks)] {
            let mut extremum = NO_PRICE;
            for tick in 0..ladder.max_ticks() {
                let lvl = ladder.level(tick);
                let occupied = ladder.is_occupied(tick);
                assert_eq!(occupied, lvl.head != NIL, "bit/level desync at {tick}");
                assert_eq!(occupied, lvl.total_qty > 0, "qty/level desync at {tick}");
                if !occupied {
                    assert_eq!(lvl.tail, NIL);
                    continue;
                }

                if extremum == NO_PRICE {
                    extremum = tick;
                } else if side == Side::Buy {
                    extremum = extremum.max(tick);
                } else {
                    extremum = extremum.min(tick);
                }

                // Walk the FIFO: linkage sane, quantities sum up.
                let mut sum = 0u64;
                let mut prev = NIL;
                let mut idx = lvl.head;
                while idx != NIL {
                    let n = self.pool.get(idx);
                    assert_eq!(n.prev, prev, "prev link broken at {tick}");
                    assert_eq!(n.price_tick, tick);
                    assert_eq!(n.side, side);
                    assert!(n.qty > 0, "zero-qty node linked at {tick}");
                    sum += n.qty as u64;
                    linked += 1;
                    prev = idx;
                    idx = n.next;
                }
                assert_eq!(prev, lvl.tail, "tail link broken at {tick}");
                assert_eq!(sum, lvl.total_qty, "total_qty drift at {tick}");
            }
            assert_eq!(ladder.best(), extremum, "stale best on {side:?}");
        }
        assert_eq!(linked, self.pool.allocated(), "node neither free nor linked");
    }
}
