//! Criterion benchmarks for chaosfeed hot paths.
//!
//! Benchmarks:
//! 1. Chaos price engine evaluation
//! 2. Token backfill of the full 400-candle buffer
//! 3. Live ingest into a rolling window
//! 4. One simulated minute of the whole engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chaosfeed_core::candles::{CandleAggregator, BACKFILL_CANDLES, CANDLE_DURATION_MS};
use chaosfeed_core::price::ChaosPriceEngine;
use chaosfeed_core::{Simulation, SimulationConfig};

const NOW: i64 = 1_704_880_800_000;

fn bench_price_engine(c: &mut Criterion) {
    let engine = ChaosPriceEngine::default();
    c.bench_function("price_at", |b| {
        let mut t = NOW;
        b.iter(|| {
            t += 5_000;
            black_box(engine.price_at(black_box(t)))
        })
    });
}

fn bench_backfill(c: &mut Criterion) {
    let mut group = c.benchmark_group("backfill");
    for count in [150, BACKFILL_CANDLES] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut engine = ChaosPriceEngine::default();
            let mut agg = CandleAggregator::with_seed(CANDLE_DURATION_MS, count, 0);
            b.iter(|| agg.backfill(&mut engine, black_box(NOW), count))
        });
    }
    group.finish();
}

fn bench_ingest(c: &mut Criterion) {
    c.bench_function("ingest_10k", |b| {
        b.iter(|| {
            let mut agg = CandleAggregator::with_seed(1_000, 150, 0);
            for i in 0..10_000_i64 {
                agg.ingest(i * 100, 100.0 + (i as f64 * 0.01).sin());
            }
            black_box(agg.len())
        })
    });
}

fn bench_simulation(c: &mut Criterion) {
    c.bench_function("simulate_one_minute", |b| {
        b.iter(|| {
            let mut sim = Simulation::new(SimulationConfig::default(), NOW).expect("valid config");
            black_box(sim.advance_to(NOW + 60_000).len())
        })
    });
}

criterion_group!(
    benches,
    bench_price_engine,
    bench_backfill,
    bench_ingest,
    bench_simulation
);
criterion_main!(benches);
