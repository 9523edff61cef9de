//! Identifier pruning and exact duplicate-row removal.

use crate::schema::ColumnRole;
use crate::table::{ColumnData, FeatureTable};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct DedupOutcome {
    pub table: FeatureTable,
    pub dropped_columns: Vec<String>,
    pub rows_before: usize,
    pub rows_after: usize,
}

impl DedupOutcome {
    pub fn duplicates_removed(&self) -> usize {
        self.rows_before - self.rows_after
    }
}

/// Drop every column declared as an identifier.
pub fn drop_identifiers(table: &FeatureTable) -> (FeatureTable, Vec<String>) {
    let ids = table.names_where(|s| s.role == ColumnRole::Identifier);
    let (out, removed, _) = table.without_columns(&ids);
    (out, removed)
}

fn cell_eq(a: &ColumnData, i: usize, j: usize) -> bool {
    match a {
        ColumnData::Numeric(v) => match (v[i], v[j]) {
            (Some(x), Some(y)) => x == y || (x.is_nan() && y.is_nan()),
            (None, None) => true,
            _ => false,
        },
        ColumnData::Text(v) => v[i] == v[j],
    }
}

fn row_hash(table: &FeatureTable, row: usize) -> u64 {
    let mut h = DefaultHasher::new();
    for column in table.columns() {
        match &column.data {
            ColumnData::Numeric(v) => match v[row] {
                // 0.0 and -0.0 compare equal, so they must hash equal
                Some(x) if x == 0.0 => 0u64.hash(&mut h),
                Some(x) => x.to_bits().hash(&mut h),
                None => u64::MAX.hash(&mut h),
            },
            ColumnData::Text(v) => v[row].hash(&mut h),
        }
    }
    h.finish()
}

/// Keep the first occurrence of every distinct row (all columns equal).
/// Row keys are identity metadata and do not take part in the comparison.
pub fn remove_duplicates(table: &FeatureTable) -> FeatureTable {
    let mut buckets: HashMap<u64, Vec<usize>> = HashMap::new();
    let mut keep = Vec::with_capacity(table.n_rows());
    for row in 0..table.n_rows() {
        let bucket = buckets.entry(row_hash(table, row)).or_default();
        let duplicate = bucket
            .iter()
            .any(|&other| table.columns().iter().all(|c| cell_eq(&c.data, row, other)));
        if !duplicate {
            bucket.push(row);
            keep.push(row);
        }
    }
    table.select_rows(&keep)
}

pub fn prune_and_dedup(table: &FeatureTable) -> DedupOutcome {
    let (pruned, dropped_columns) = drop_identifiers(table);
    let rows_before = pruned.n_rows();
    let table = remove_duplicates(&pruned);
    let rows_after = table.n_rows();
    if rows_before > rows_after {
        warn!(duplicates = rows_before - rows_after, "duplicate rows removed");
    }
    info!(rows_before, rows_after, dropped = ?dropped_columns, "dedup complete");
    DedupOutcome {
        table,
        dropped_columns,
        rows_before,
        rows_after,
    }
}
