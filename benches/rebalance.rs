//! Rebalancing benchmark: synthetic minority oversampling + undersampling.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowprep::config::RebalanceConfig;
use flowprep::rebalance::{Rebalancer, Smote};
use ndarray::{Array1, Array2};

fn imbalanced(minority: usize, majority: usize, dim: usize) -> (Array2<f64>, Array1<u8>) {
    let n = minority + majority;
    let x = Array2::from_shape_fn((n, dim), |(i, j)| ((i * 31 + j * 7) % 101) as f64 / 101.0);
    let y = (0..n).map(|i| u8::from(i < minority)).collect();
    (x, y)
}

fn bench_smote(c: &mut Criterion) {
    let (x, y) = imbalanced(200, 4_000, 24);
    let smote = Smote::new(0.5, 5, 42);
    c.bench_function("smote_200_vs_4000_24d", |b| {
        b.iter(|| smote.fit_resample(black_box(&x), black_box(&y)).unwrap())
    });
}

fn bench_full(c: &mut Criterion) {
    let (x, y) = imbalanced(200, 4_000, 24);
    let rebalancer = Rebalancer::new(&RebalanceConfig::default());
    c.bench_function("rebalance_default_ratios", |b| {
        b.iter(|| rebalancer.fit_resample(black_box(&x), black_box(&y)).unwrap())
    });
}

criterion_group!(benches, bench_smote, bench_full);
criterion_main!(benches);
