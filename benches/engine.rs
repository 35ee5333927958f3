//! Criterion benchmarks for the cycle engine.
//!
//! Run with:
//!   cargo bench
//!
//! Results are saved to target/criterion/

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use gridbrain::engine::CycleEngine;
use gridbrain::network::{Network, NetworkConfig};

fn make_engine(width: usize, height: usize, k: usize, seed: u64) -> CycleEngine {
    let net = Network::new(NetworkConfig::with_size(width, height, k).with_seed(seed))
        .expect("bench config is valid");
    let mut engine = CycleEngine::new(net);
    // The default cubic budget would dominate; fix the sweep length so the
    // comparison across sizes stays per-step.
    engine.set_steps_per_cycle(10_000);
    engine
}

/// Sweep cost across grid sizes at fixed sweep length.
fn bench_cycle_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_cycle");
    group.throughput(Throughput::Elements(10_000));

    for &(width, height) in &[(7usize, 2usize), (7, 7), (16, 16), (32, 32)] {
        let k = 2;
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &(width, height),
            |b, &(width, height)| {
                let mut engine = make_engine(width, height, k, 42);
                b.iter(|| black_box(engine.run_cycle(7)));
            },
        );
    }

    group.finish();
}

/// Reinforcement cost: stake accumulation plus extremal mutation.
fn bench_stimulate(c: &mut Criterion) {
    let mut group = c.benchmark_group("stimulate");

    for &(width, height) in &[(7usize, 7usize), (16, 16)] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{width}x{height}")),
            &(width, height),
            |b, &(width, height)| {
                let mut engine = make_engine(width, height, 2, 7);
                let _ = engine.run_cycle(7);
                b.iter(|| {
                    engine.network_mut().stimulate(black_box(false));
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_cycle_sizes, bench_stimulate);
criterion_main!(benches);
