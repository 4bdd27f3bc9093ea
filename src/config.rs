//! Run configuration: engine bounds and benchmark knobs.

/// Number of discrete price ticks per side. The ladder is a fixed array
/// indexed by tick, so this bounds the price range directly.
pub const MAX_TICKS: u32 = 32_768;

/// Capacity of each engine's order-node pool.
pub const MAX_ORDERS: u32 = 500_000;

/// Default per-queue ring capacity (rounded up to a power of two by the
/// ring itself).
pub const DEFAULT_RING_CAPACITY: usize = 1 << 20;

/// Maximum messages a worker drains per `pop_batch` call.
pub const BATCH_SIZE: usize = 10_000;

/// Workers flush local counters to the shared stats after draining at
/// least this many messages.
pub const STATS_FLUSH_EVERY: u64 = 50_000;

/// Failed pushes spin-hint this many times before degrading to a
/// cooperative yield.
pub const SPIN_RETRIES_BEFORE_YIELD: u32 = 100;

/// Runtime knobs consumed by the producer and the runner.
#[derive(Clone, Debug)]
pub struct Config {
    /// Total messages the producer emits.
    pub num_orders: u64,
    /// Prices are drawn uniformly from `mid ± span_ticks`.
    pub span_ticks: u32,
    /// Quantities are drawn uniformly from `[1, max_qty]`.
    pub max_qty: u32,
    /// Every `cancel_every`-th message becomes a cancel when possible.
    /// Zero disables cancel injection.
    pub cancel_every: u64,
    /// Seed for the producer's deterministic stream.
    pub rng_seed: u64,
    /// Number of worker threads (one ring and one engine each).
    pub num_workers: usize,
    /// Per-queue ring capacity.
    pub ring_capacity: usize,
    /// Pin each worker to a core, best effort.
    pub pin_workers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_orders: 1_000_000,
            span_ticks: 50,
            max_qty: 10,
            cancel_every: 100_000,
            rng_seed: 12,
            num_workers: 8,
            ring_capacity: DEFAULT_RING_CAPACITY,
            pin_workers: false,
        }
    }
}
