//! # tickmatch
//!
//! A multi-queue limit-order-book matching benchmark harness.
//!
//! ## Design Principles
//!
//! - **Single-Writer Books**: each worker thread owns its engine exclusively (no locks)
//! - **Fixed Slabs**: order nodes, handles, and price levels live in pre-allocated arrays with 32-bit indices
//! - **Lock-Free Transport**: bounded rings with per-slot sequence numbers carry messages producer → worker
//! - **Bitset Price Ladder**: best-price maintenance scans occupancy words with tz/lz counts
//!
//! ## Architecture
//!
//! ```text
//! [Producer Thread] --> [Ring 0] --> [Worker 0 + Engine 0]
//!                   --> [Ring 1] --> [Worker 1 + Engine 1]
//!                   --> [ ... ] --> [ ...               ]
//!                        |
//!                  [producer_done]
//! ```
//!
//! The producer raises `producer_done` after its last successful push; a
//! worker exits once it observes the flag with an empty ring, which
//! guarantees no message is dropped or consumed twice.

pub mod config;
pub mod engine;
pub mod handle;
pub mod ladder;
pub mod message;
pub mod pool;
pub mod producer;
pub mod ring;
pub mod runner;
pub mod stats;
pub mod worker;

// Re-exports for convenience
pub use config::Config;
pub use engine::{AddOutcome, MatchingEngine};
pub use handle::HandleTable;
pub use ladder::{PriceLadder, PriceLevel, NO_PRICE};
pub use message::{MsgType, OrderMsg, Side, FLAG_FOK, FLAG_IOC};
pub use pool::{NodePool, OrderNode, NIL};
pub use producer::OrderGenerator;
pub use ring::RingQueue;
pub use runner::{run, RunReport};
pub use stats::{Stats, StatsSnapshot};
pub use worker::{MatchingWorker, WorkerReport};
