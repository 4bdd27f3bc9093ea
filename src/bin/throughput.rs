//! Throughput harness entry point.
//!
//! Usage: `throughput [num_orders] [num_workers] [rng_seed] [cancel_every]`
//!
//! Runs the full producer → rings → workers pipeline, prints the counter
//! summary, then runs a short single-engine probe and prints add-latency
//! percentiles.

use std::env;
use std::time::Instant;

use hdrhistogram::Histogram;

use tickmatch::{run, AddOutcome, Config, MatchingEngine, OrderMsg, Side};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let mut cfg = Config::default();
    if let Some(v) = args.get(1) {
        cfg.num_orders = v.parse().expect("num_orders must be an integer");
    }
    if let Some(v) = args.get(2) {
        cfg.num_workers = v.parse().expect("num_workers must be an integer");
    }
    if let Some(v) = args.get(3) {
        cfg.rng_seed = v.parse().expect("rng_seed must be an integer");
    }
    if let Some(v) = args.get(4) {
        cfg.cancel_every = v.parse().expect("cancel_every must be an integer");
    }

    println!("=== tickmatch throughput run ===");
    println!(
        "orders: {}  workers: {}  seed: {}  cancel_every: {}",
        cfg.num_orders, cfg.num_workers, cfg.rng_seed, cfg.cancel_every
    );

    let report = run(&cfg);
    let snap = report.stats;

    println!();
    println!("generated:  {:>14}", snap.generated);
    println!("pushed:     {:>14}", snap.pushed);
    println!("processed:  {:>14}", snap.popped);
    println!("filled:     {:>14}", snap.filled);
    println!("rested:     {:>14}", snap.resting);
    println!("cancelled:  {:>14}", snap.cancelled);
    println!("rejected:   {:>14}", snap.rejected);
    println!("trades:     {:>14}", report.total_trades());
    println!("volume:     {:>14}", report.total_volume());
    println!("open:       {:>14}", report.resting_at_end());
    println!();
    println!(
        "elapsed: {:.3} s   throughput: {:.0} msgs/sec",
        report.elapsed.as_secs_f64(),
        report.orders_per_sec()
    );

    for w in &report.workers {
        println!(
            "  worker {}: processed {:>10}  trades {:>10}  open {:>8}  bid {:?}  ask {:?}",
            w.id, w.processed, w.trades, w.live_orders, w.best_bid, w.best_ask
        );
    }

    latency_probe();
}

/// Single-engine probe: time `add_limit` over a deterministic command mix
/// and report percentiles.
fn latency_probe() {
    const WARMUP: u64 = 10_000;
    const ITERATIONS: u64 = 1_000_000;

    let mut engine = MatchingEngine::new(tickmatch::config::MAX_TICKS, 200_000);
    engine.warm_up();

    let mut histogram =
        Histogram::<u64>::new_with_bounds(1, 10_000_000, 3).expect("histogram bounds");

    let msg_for = |i: u64| {
        let side = if i % 2 == 0 { Side::Buy } else { Side::Sell };
        let tick = 16_000 + (i % 100) as u32;
        OrderMsg::add(i + 1, 0, side, tick, 1 + (i % 10) as u32, 0)
    };

    for i in 0..WARMUP {
        std::hint::black_box(engine.add_limit(&msg_for(i)));
    }

    let mut resting = 0u64;
    for i in 0..ITERATIONS {
        let msg = msg_for(WARMUP + i);
        let t0 = Instant::now();
        let out = engine.add_limit(&msg);
        let ns = t0.elapsed().as_nanos() as u64;
        histogram.saturating_record(ns.max(1));
        if matches!(out, AddOutcome::Resting(_)) {
            resting += 1;
        }
    }

    println!();
    println!("=== single-engine add_limit latency ({ITERATIONS} ops) ===");
    println!("p50:  {:>8} ns", histogram.value_at_quantile(0.50));
    println!("p95:  {:>8} ns", histogram.value_at_quantile(0.95));
    println!("p99:  {:>8} ns", histogram.value_at_quantile(0.99));
    println!("p999: {:>8} ns", histogram.value_at_quantile(0.999));
    println!("max:  {:>8} ns", histogram.max());
    println!("rested during probe: {resting}");
}
