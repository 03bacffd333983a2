//! Criterion benchmarks for full reconciliation runs.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use shelf_bench::{reference_profile, stress_profile};
use shelf_core::RankLayout;
use shelf_engine::Reconciler;

fn bench_run_reference(c: &mut Criterion) {
    let plano = reference_profile(42);
    let reconciler = Reconciler::default();

    c.bench_function("run_reference", |b| {
        b.iter_batched(
            || plano.clone(),
            |mut plano| {
                let result = reconciler.run(&mut plano, &mut RankLayout::new());
                black_box(&result);
            },
            BatchSize::SmallInput,
        );
    });
}

fn bench_run_stress(c: &mut Criterion) {
    let plano = stress_profile(42);
    let reconciler = Reconciler::default();

    c.bench_function("run_stress", |b| {
        b.iter_batched(
            || plano.clone(),
            |mut plano| {
                let result = reconciler.run(&mut plano, &mut RankLayout::new());
                black_box(&result);
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_layout_all(c: &mut Criterion) {
    let mut plano = stress_profile(7);
    let mut host = RankLayout::new();

    c.bench_function("layout_all_stress", |b| {
        b.iter(|| {
            host.layout_all(&mut plano).unwrap();
            black_box(plano.position_count());
        });
    });
}

criterion_group!(
    benches,
    bench_run_reference,
    bench_run_stress,
    bench_layout_all
);
criterion_main!(benches);
