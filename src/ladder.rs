//! The price ladder: one `PriceLevel` per tick plus an occupancy bitset.
//!
//! Each level is a doubly-linked FIFO of pool nodes (price-time priority).
//! The bitset carries one bit per tick; best-price maintenance scans it a
//! word at a time with trailing/leading zero counts, so a rescan costs
//! O(MAX_TICKS / 64) worst case and one word when prices cluster.

use crate::message::Side;
use crate::pool::{NodePool, PoolIndex, NIL};

/// Sentinel meaning "no occupied tick on this side".
pub const NO_PRICE: u32 = u32::MAX;

const WORD_BITS: u32 = 64;

/// FIFO queue of resting orders at a single tick.
#[derive(Clone, Copy, Debug)]
pub struct PriceLevel {
    /// Oldest order; first to match.
    pub head: PoolIndex,
    /// Newest order.
    pub tail: PoolIndex,
    /// Sum of remaining quantities across linked nodes.
    pub total_qty: u64,
}

impl PriceLevel {
    #[inline]
    pub const fn new() -> Self {
        Self {
            head: NIL,
            tail: NIL,
            total_qty: 0,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.head == NIL
    }

    /// Append `idx` at the tail and grow `total_qty` by its quantity.
    #[inline]
    pub fn push_back(&mut self, pool: &mut NodePool, idx: PoolIndex) {
        let qty = pool.get(idx).qty;

        pool.get_mut(idx).prev = self.tail;
        pool.get_mut(idx).next = NIL;
        if self.tail == NIL {
            debug_assert!(self.head == NIL);
            self.head = idx;
        } else {
            pool.get_mut(self.tail).next = idx;
        }
        self.tail = idx;
        self.total_qty += qty as u64;
    }

    /// Unlink `idx` from anywhere in the FIFO, fixing up head/tail.
    ///
    /// Linkage only; the caller settles `total_qty` (matching already
    /// subtracted the traded quantity, cancel applies its own rule) and
    /// frees the node.
    ///
    /// Returns `true` if the level is empty afterwards.
    #[inline]
    pub fn unlink(&mut self, pool: &mut NodePool, idx: PoolIndex) -> bool {
        let prev = pool.get(idx).prev;
        let next = pool.get(idx).next;

        if prev != NIL {
            pool.get_mut(prev).next = next;
        } else {
            debug_assert!(self.head == idx);
            self.head = next;
        }
        if next != NIL {
            pool.get_mut(next).prev = prev;
        } else {
            debug_assert!(self.tail == idx);
            self.tail = prev;
        }

        self.head == NIL
    }
}

impl Default for PriceLevel {
    fn default() -> Self {
        Self::new()
    }
}

/// One side of the book: levels indexed by tick, occupancy bits, cached best.
pub struct PriceLadder {
    side: Side,
    levels: Vec<PriceLevel>,
    bits: Vec<u64>,
    best: u32,
    max_ticks: u32,
}

impl PriceLadder {
    pub fn new(side: Side, max_ticks: u32) -> Self {
        assert!(max_ticks >= 2, "need at least two ticks");
        let words = (max_ticks + WORD_BITS - 1) / WORD_BITS;
        Self {
            side,
            levels: vec![PriceLevel::new(); max_ticks as usize],
            bits: vec![0; words as usize],
            best: NO_PRICE,
            max_ticks,
        }
    }

    #[inline]
    pub fn level(&self, tick: u32) -> &PriceLevel {
        &self.levels[tick as usize]
    }

    #[inline]
    pub fn level_mut(&mut self, tick: u32) -> &mut PriceLevel {
        &mut self.levels[tick as usize]
    }

    /// Best occupied tick: max for bids, min for asks. `NO_PRICE` if none.
    #[inline]
    pub fn best(&self) -> u32 {
        self.best
    }

    #[inline]
    pub fn max_ticks(&self) -> u32 {
        self.max_ticks
    }

    #[inline]
    pub fn is_occupied(&self, tick: u32) -> bool {
        (self.bits[(tick / WORD_BITS) as usize] >> (tick % WORD_BITS)) & 1 != 0
    }

    /// Record liquidity at `tick`: set its bit and promote `best` when the
    /// tick beats the current extremum.
    #[inline]
    pub fn mark_occupied(&mut self, tick: u32) {
        self.bits[(tick / WORD_BITS) as usize] |= 1u64 << (tick % WORD_BITS);
        let better = match self.side {
            Side::Buy => self.best == NO_PRICE || tick > self.best,
            Side::Sell => self.best == NO_PRICE || tick < self.best,
        };
        if better {
            self.best = tick;
        }
    }

    /// A level just emptied: clear its bit and, when it held the best
    /// price, rescan the bitset for the next extremum.
    #[inline]
    pub fn clear_level(&mut self, tick: u32) {
        debug_assert!(self.levels[tick as usize].is_empty());
        self.bits[(tick / WORD_BITS) as usize] &= !(1u64 << (tick % WORD_BITS));
        if tick != self.best {
            return;
        }
        self.best = match self.side {
            Side::Buy => {
                if tick == 0 {
                    NO_PRICE
                } else {
                    self.prev_occupied_from(tick - 1)
                }
            }
            Side::Sell => self.next_occupied_from(tick + 1),
        };
    }

    /// First occupied tick >= `from`, scanning forward.
    fn next_occupied_from(&self, from: u32) -> u32 {
        let words = self.bits.len() as u32;
        let mut w = from / WORD_BITS;
        if w >= words {
            return NO_PRICE;
        }
        let b = from % WORD_BITS;

        let word = self.bits[w as usize] & (!0u64 << b);
        if word != 0 {
            return w * WORD_BITS + word.trailing_zeros();
        }
        w += 1;
        while w < words {
            let word = self.bits[w as usize];
            if word != 0 {
                return w * WORD_BITS + word.trailing_zeros();
            }
            w += 1;
        }
        NO_PRICE
    }

    /// Last occupied tick <= `from`, scanning backward.
    fn prev_occupied_from(&self, from: u32) -> u32 {
        let words = self.bits.len() as u32;
        let mut w = from / WORD_BITS;
        if w >= words {
            return NO_PRICE;
        }
        let b = from % WORD_BITS;

        let mask = if b == WORD_BITS - 1 {
            !0u64
        } else {
            (1u64 << (b + 1)) - 1
        };
        let word = self.bits[w as usize] & mask;
        if word != 0 {
            return w * WORD_BITS + (WORD_BITS - 1 - word.leading_zeros());
        }
        while w > 0 {
            w -= 1;
            let word = self.bits[w as usize];
            if word != 0 {
                return w * WORD_BITS + (WORD_BITS - 1 - word.leading_zeros());
            }
        }
        NO_PRICE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rest_node(pool: &mut NodePool, qty: u32) -> PoolIndex {
        let idx = pool.alloc().unwrap();
        pool.get_mut(idx).qty = qty;
        idx
    }

    #[test]
    fn test_level_fifo_linkage() {
        let mut pool = NodePool::new(8);
        let mut lvl = PriceLevel::new();

        let a = rest_node(&mut pool, 10);
        let b = rest_node(&mut pool, 20);
        let c = rest_node(&mut pool, 30);
        lvl.push_back(&mut pool, a);
        lvl.push_back(&mut pool, b);
        lvl.push_back(&mut pool, c);

        assert_eq!(lvl.head, a);
        assert_eq!(lvl.tail, c);
        assert_eq!(lvl.total_qty, 60);
        assert_eq!(pool.get(a).next, b);
        assert_eq!(pool.get(b).prev, a);
        assert_eq!(pool.get(b).next, c);
        assert_eq!(pool.get(c).prev, b);
    }

    #[test]
    fn test_unlink_head_middle_tail() {
        let mut pool = NodePool::new(8);
        let mut lvl = PriceLevel::new();
        let nodes: Vec<_> = (0..4).map(|_| rest_node(&mut pool, 5)).collect();
        for &n in &nodes {
            lvl.push_back(&mut pool, n);
        }

        assert!(!lvl.unlink(&mut pool, nodes[1])); // middle
        assert_eq!(pool.get(nodes[0]).next, nodes[2]);
        assert_eq!(pool.get(nodes[2]).prev, nodes[0]);

        assert!(!lvl.unlink(&mut pool, nodes[0])); // head
        assert_eq!(lvl.head, nodes[2]);
        assert_eq!(pool.get(nodes[2]).prev, NIL);

        assert!(!lvl.unlink(&mut pool, nodes[3])); // tail
        assert_eq!(lvl.tail, nodes[2]);

        assert!(lvl.unlink(&mut pool, nodes[2])); // last
        assert!(lvl.is_empty());
        assert_eq!(lvl.tail, NIL);
    }

    #[test]
    fn test_occupancy_and_best_bids() {
        let mut ladder = PriceLadder::new(Side::Buy, 32_768);
        assert_eq!(ladder.best(), NO_PRICE);

        ladder.mark_occupied(16_000);
        assert_eq!(ladder.best(), 16_000);
        ladder.mark_occupied(15_990);
        assert_eq!(ladder.best(), 16_000); // lower bid does not improve
        ladder.mark_occupied(16_010);
        assert_eq!(ladder.best(), 16_010);

        assert!(ladder.is_occupied(16_000));
        assert!(!ladder.is_occupied(16_001));
    }

    #[test]
    fn test_occupancy_and_best_asks() {
        let mut ladder = PriceLadder::new(Side::Sell, 32_768);

        ladder.mark_occupied(16_000);
        ladder.mark_occupied(16_010);
        assert_eq!(ladder.best(), 16_000);
        ladder.mark_occupied(15_990);
        assert_eq!(ladder.best(), 15_990);
    }

    #[test]
    fn test_clear_best_rescans_down_for_bids() {
        let mut ladder = PriceLadder::new(Side::Buy, 32_768);
        ladder.mark_occupied(100);
        ladder.mark_occupied(200);
        ladder.mark_occupied(300);

        ladder.clear_level(300);
        assert_eq!(ladder.best(), 200);
        ladder.clear_level(200);
        assert_eq!(ladder.best(), 100);
        ladder.clear_level(100);
        assert_eq!(ladder.best(), NO_PRICE);
    }

    #[test]
    fn test_clear_best_rescans_up_for_asks() {
        let mut ladder = PriceLadder::new(Side::Sell, 32_768);
        ladder.mark_occupied(100);
        ladder.mark_occupied(200);
        ladder.mark_occupied(300);

        ladder.clear_level(100);
        assert_eq!(ladder.best(), 200);
        ladder.clear_level(200);
        assert_eq!(ladder.best(), 300);
        ladder.clear_level(300);
        assert_eq!(ladder.best(), NO_PRICE);
    }

    #[test]
    fn test_clear_non_best_keeps_best() {
        let mut ladder = PriceLadder::new(Side::Buy, 32_768);
        ladder.mark_occupied(100);
        ladder.mark_occupied(300);
        ladder.clear_level(100);
        assert_eq!(ladder.best(), 300);
    }

    #[test]
    fn test_scans_cross_word_boundaries() {
        // Ticks straddling the 64-bit word edges.
        let mut ladder = PriceLadder::new(Side::Sell, 32_768);
        ladder.mark_occupied(63);
        ladder.mark_occupied(64);
        ladder.mark_occupied(129);

        assert_eq!(ladder.best(), 63);
        ladder.clear_level(63);
        assert_eq!(ladder.best(), 64);
        ladder.clear_level(64);
        assert_eq!(ladder.best(), 129);

        let mut bids = PriceLadder::new(Side::Buy, 32_768);
        bids.mark_occupied(129);
        bids.mark_occupied(64);
        bids.mark_occupied(63);
        assert_eq!(bids.best(), 129);
        bids.clear_level(129);
        assert_eq!(bids.best(), 64);
        bids.clear_level(64);
        assert_eq!(bids.best(), 63);
    }

    #[test]
    fn test_edge_ticks() {
        let mut bids = PriceLadder::new(Side::Buy, 32_768);
        bids.mark_occupied(0);
        assert_eq!(bids.best(), 0);
        bids.clear_level(0);
        assert_eq!(bids.best(), NO_PRICE);

        let mut asks = PriceLadder::new(Side::Sell, 32_768);
        asks.mark_occupied(32_767);
        assert_eq!(asks.best(), 32_767);
        asks.clear_level(32_767);
        assert_eq!(asks.best(), NO_PRICE);
    }
}
