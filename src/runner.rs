//! Run orchestration: one producer, N rings, N workers, one shared done
//! flag. Wires everything up, joins everything, and folds the results into
//! a `RunReport`.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::Config;
use crate::message::OrderMsg;
use crate::producer::OrderGenerator;
use crate::ring::RingQueue;
use crate::stats::{Stats, StatsSnapshot};
use crate::worker::{MatchingWorker, WorkerReport};

/// Aggregated outcome of one harness run.
#[derive(Debug)]
pub struct RunReport {
    pub stats: StatsSnapshot,
    pub workers: Vec<WorkerReport>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn total_trades(&self) -> u64 {
        self.workers.iter().map(|w| w.trades).sum()
    }

    pub fn total_volume(&self) -> u64 {
        self.workers.iter().map(|w| w.volume).sum()
    }

    pub fn resting_at_end(&self) -> u64 {
        self.workers.iter().map(|w| w.live_orders as u64).sum()
    }

    pub fn orders_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.stats.popped as f64 / secs
        } else {
            0.0
        }
    }
}

/// Execute one full run: spawn workers, spawn the producer, join, report.
pub fn run(cfg: &Config) -> RunReport {
    assert!(cfg.num_workers > 0, "need at least one worker");

    let stats = Arc::new(Stats::new());
    let done = Arc::new(AtomicBool::new(false));
    let rings: Vec<Arc<RingQueue<OrderMsg>>> = (0..cfg.num_workers)
        .map(|_| Arc::new(RingQueue::new(cfg.ring_capacity)))
        .collect();

    info!(
        num_orders = cfg.num_orders,
        num_workers = cfg.num_workers,
        ring_capacity = rings[0].capacity(),
        seed = cfg.rng_seed,
        "starting run"
    );

    let start = Instant::now();

    let worker_handles: Vec<_> = rings
        .iter()
        .enumerate()
        .map(|(i, ring)| {
            let worker =
                MatchingWorker::new(i, Arc::clone(ring), Arc::clone(&done), Arc::clone(&stats));
            let pin = cfg.pin_workers;
            thread::Builder::new()
                .name(format!("worker-{i}"))
                .spawn(move || {
                    if pin {
                        pin_to_core(i);
                    }
                    worker.run()
                })
                .expect("failed to spawn worker thread")
        })
        .collect();

    let producer = OrderGenerator::new(
        cfg.clone(),
        rings.clone(),
        Arc::clone(&done),
        Arc::clone(&stats),
    );
    let producer_handle = thread::Builder::new()
        .name("producer".into())
        .spawn(move || producer.run())
        .expect("failed to spawn producer thread");

    producer_handle.join().expect("producer thread panicked");
    let workers: Vec<WorkerReport> = worker_handles
        .into_iter()
        .map(|h| h.join().expect("worker thread panicked"))
        .collect();

    let elapsed = start.elapsed();
    let report = RunReport {
        stats: stats.snapshot(),
        workers,
        elapsed,
    };

    debug!(
        popped = report.stats.popped,
        trades = report.total_trades(),
        elapsed_ms = elapsed.as_millis() as u64,
        "run complete"
    );

    report
}

/// Best-effort pin of the current thread to a core, one worker per core.
fn pin_to_core(index: usize) {
    if let Some(cores) = core_affinity::get_core_ids() {
        if let Some(core) = cores.get(index % cores.len().max(1)) {
            core_affinity::set_for_current(*core);
        }
    }
}
