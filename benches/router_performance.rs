//! Performance benchmarks for the routing engine

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use queue_pilot::clock::SystemClock;
use queue_pilot::config::EngineConfig;
use queue_pilot::engine::LineRouter;
use queue_pilot::types::Strategy;
use std::sync::Arc;

fn bench_router(lines: usize) -> LineRouter {
    let config = EngineConfig {
        number_of_lines: lines,
        max_per_line: 0,
        ..EngineConfig::default()
    };
    LineRouter::new(&config, Arc::new(SystemClock::new()))
}

fn bench_admit_depart_cycle(c: &mut Criterion) {
    c.bench_function("admit_depart_cycle_3_lines", |b| {
        let mut router = bench_router(3);
        b.iter(|| {
            let line = router.admit(black_box(Strategy::FewestPeople)).unwrap();
            router.depart(black_box(line)).unwrap();
        });
    });
}

fn bench_strategy_selection(c: &mut Criterion) {
    let mut group = c.benchmark_group("next_line_10_lines");

    let mut router = bench_router(10);
    // A populated, uneven queue shape so selection does real work.
    for i in 0..200 {
        router.admit_to(1 + (i * 7) % 10).unwrap();
    }

    for strategy in [
        Strategy::ShortestWait,
        Strategy::FewestPeople,
        Strategy::FarthestFromEntrance,
        Strategy::NearestToEntrance,
    ] {
        group.bench_function(strategy.to_string(), |b| {
            b.iter(|| router.next_line(black_box(strategy)));
        });
    }
    group.finish();
}

fn bench_wait_estimation(c: &mut Criterion) {
    let mut router = bench_router(3);
    for _ in 0..50 {
        router.admit_to(2).unwrap();
    }

    c.bench_function("estimated_wait_deep_line", |b| {
        b.iter(|| router.estimated_wait(black_box(2)).unwrap());
    });

    c.bench_function("estimated_wait_with_arrivals", |b| {
        b.iter(|| router.estimated_wait_with_arrivals(black_box(2), black_box(0.05)).unwrap());
    });
}

criterion_group!(
    benches,
    bench_admit_depart_cycle,
    bench_strategy_selection,
    bench_wait_estimation
);
criterion_main!(benches);
