//! Shared run counters.
//!
//! All updates are relaxed atomic adds off the critical path; exact totals
//! are only meaningful after every thread has joined.

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct Stats {
    /// Messages synthesized by the producer.
    pub generated: AtomicU64,
    /// Messages successfully pushed onto a ring.
    pub pushed: AtomicU64,
    /// Messages drained by workers.
    pub popped: AtomicU64,
    /// Adds fully executed on arrival.
    pub filled: AtomicU64,
    /// Adds that rested in a book.
    pub resting: AtomicU64,
    /// Cancels that hit a live resting order.
    pub cancelled: AtomicU64,
    /// Adds rejected by the engine.
    pub rejected: AtomicU64,
}

/// Plain-value copy of the counters, taken after a run settles.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatsSnapshot {
    pub generated: u64,
    pub pushed: u64,
    pub popped: u64,
    pub filled: u64,
    pub resting: u64,
    pub cancelled: u64,
    pub rejected: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add_popped(&self, n: u64) {
        self.popped.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_filled(&self, n: u64) {
        self.filled.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_resting(&self, n: u64) {
        self.resting.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_cancelled(&self, n: u64) {
        self.cancelled.fetch_add(n, Ordering::Relaxed);
    }

    #[inline]
    pub fn add_rejected(&self, n: u64) {
        self.rejected.fetch_add(n, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            generated: self.generated.load(Ordering::Relaxed),
            pushed: self.pushed.load(Ordering::Relaxed),
            popped: self.popped.load(Ordering::Relaxed),
            filled: self.filled.load(Ordering::Relaxed),
            resting: self.resting.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}
