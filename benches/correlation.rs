//! Correlation pruning benchmark: Pearson matrix + single-pass drop over a
//! synthetic table with correlated column groups.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flowprep::schema::{ColumnKind, ColumnRole, ColumnSpec};
use flowprep::stages::correlation::prune_correlated;
use flowprep::stages::ColumnOrder;
use flowprep::table::{Column, FeatureTable, RowKey};

fn synthetic_table(rows: usize, cols: usize) -> FeatureTable {
    let columns = (0..cols)
        .map(|j| {
            // every fourth column is a near copy of its predecessor
            let values = (0..rows)
                .map(|i| {
                    let base = ((i * (j / 4 + 3)) % 97) as f64;
                    Some(if j % 4 == 3 { base * 2.0 + 1.0 } else { base + (i * j % 13) as f64 })
                })
                .collect();
            Column::numeric(
                ColumnSpec::new(format!("f{}", j), ColumnKind::Numeric, ColumnRole::Feature),
                values,
            )
        })
        .collect();
    let keys = (0..rows as u64).map(|line| RowKey { source: 0, line }).collect();
    FeatureTable::new(columns, keys).unwrap()
}

fn bench_prune(c: &mut Criterion) {
    let mut g = c.benchmark_group("correlation_prune");
    for cols in [16, 32, 48] {
        let table = synthetic_table(2_000, cols);
        g.bench_with_input(BenchmarkId::from_parameter(cols), &table, |b, t| {
            b.iter(|| prune_correlated(black_box(t), ColumnOrder::from_table(t), 0.9))
        });
    }
    g.finish();
}

criterion_group!(benches, bench_prune);
criterion_main!(benches);
