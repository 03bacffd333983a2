//! Criterion benchmarks for donor selection.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shelf_bench::random_candidates;
use shelf_engine::selection::{select_for_inflation, select_tiered};

fn bench_select_for_inflation(c: &mut Criterion) {
    let cands = random_candidates(1000, 42);

    c.bench_function("select_for_inflation_1000", |b| {
        b.iter(|| {
            let sel = select_for_inflation(black_box(&cands), black_box(0.1));
            black_box(sel);
        });
    });
}

fn bench_select_tiered(c: &mut Criterion) {
    let cands = random_candidates(1000, 42);
    let boundary = cands.last().map_or(0.0, |c| c.right) + 0.2;

    c.bench_function("select_tiered_1000", |b| {
        b.iter(|| {
            let sel = select_tiered(
                black_box(&cands),
                black_box(&cands),
                black_box(0.1),
                boundary,
                0.005,
            );
            black_box(sel);
        });
    });
}

criterion_group!(benches, bench_select_for_inflation, bench_select_tiered);
criterion_main!(benches);
