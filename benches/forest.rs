//! Forest benchmark: fitting for importance ranking, and per-record scoring.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flowprep::config::ForestConfig;
use flowprep::model::{ProbabilityModel, RandomForest};
use ndarray::{Array1, Array2};

fn dataset(n: usize, dim: usize) -> (Array2<f64>, Array1<u8>, Vec<String>) {
    let x = Array2::from_shape_fn((n, dim), |(i, j)| ((i * (j + 3)) % 53) as f64 / 53.0);
    let y = (0..n).map(|i| u8::from(x[[i, 0]] + x[[i, 1]] > 1.0)).collect();
    let names = (0..dim).map(|j| format!("f{}", j)).collect();
    (x, y, names)
}

fn bench_fit(c: &mut Criterion) {
    let (x, y, names) = dataset(1_000, 16);
    let config = ForestConfig {
        n_trees: 20,
        ..ForestConfig::default()
    };
    c.bench_function("forest_fit_20_trees_1000x16", |b| {
        b.iter(|| RandomForest::fit(black_box(&x), black_box(&y), names.clone(), &config).unwrap())
    });
}

fn bench_predict(c: &mut Criterion) {
    let (x, y, names) = dataset(1_000, 16);
    let forest = RandomForest::fit(&x, &y, names, &ForestConfig::default()).unwrap();
    let row = vec![0.4; 16];
    c.bench_function("forest_predict_100_trees", |b| {
        b.iter(|| forest.predict_proba(black_box(&row)))
    });
}

criterion_group!(benches, bench_fit, bench_predict);
criterion_main!(benches);
