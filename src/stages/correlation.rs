//! Correlation pruning over an explicit, versioned column ordering.
//!
//! A single pass over the upper triangle: a feature is dropped when its
//! absolute correlation with an earlier *retained* feature exceeds the
//! threshold. The later column of a pair always goes, and a column removed in
//! this pass never causes another removal, so both members of one pair are
//! never dropped together.

use crate::schema::ColumnRole;
use crate::stats::pearson;
use crate::table::FeatureTable;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::info;

/// The column ordering that decides which member of a correlated pair is
/// kept. Passed in explicitly instead of being inherited from stage history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnOrder {
    pub version: u32,
    pub names: Vec<String>,
}

impl ColumnOrder {
    pub const VERSION: u32 = 1;

    pub fn new(names: Vec<String>) -> Self {
        Self {
            version: Self::VERSION,
            names,
        }
    }

    /// Numeric features in table order, then diagnostic indicator columns.
    pub fn from_table(table: &FeatureTable) -> Self {
        let mut names = table.numeric_feature_names();
        names.extend(table.names_where(|s| s.role == ColumnRole::Diagnostic));
        Self::new(names)
    }
}

/// Symmetric |r| matrix; diagonal 1, zero-variance pairs 0.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn compute(table: &FeatureTable, order: &ColumnOrder) -> Self {
        let (columns, names): (Vec<Vec<f64>>, Vec<String>) = order
            .names
            .iter()
            .filter_map(|n| table.column(n).and_then(|c| c.dense()).map(|d| (d, n.clone())))
            .unzip();
        let d = names.len();
        let mut values = Array2::<f64>::eye(d);
        for i in 0..d {
            for j in (i + 1)..d {
                let r = pearson(&columns[i], &columns[j]).abs();
                values[[i, j]] = r;
                values[[j, i]] = r;
            }
        }
        Self { names, values }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        Some(self.values[[self.index_of(a)?, self.index_of(b)?]])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelatedPair {
    pub dropped: String,
    pub kept: String,
    pub r: f64,
}

/// Strongest feature association of each diagnostic indicator column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorCorrelation {
    pub indicator: String,
    pub feature: String,
    pub r: f64,
}

#[derive(Debug, Clone)]
pub struct CorrelationOutcome {
    pub table: FeatureTable,
    pub order: ColumnOrder,
    pub dropped: Vec<CorrelatedPair>,
    pub indicators: Vec<IndicatorCorrelation>,
}

/// Feature columns (in `order`) to drop for exceeding `threshold` against an
/// earlier retained feature.
pub fn correlated_features(
    matrix: &CorrelationMatrix,
    is_feature: impl Fn(&str) -> bool,
    threshold: f64,
) -> Vec<CorrelatedPair> {
    let mut retained: Vec<usize> = Vec::new();
    let mut dropped = Vec::new();
    for (j, name) in matrix.names.iter().enumerate() {
        if !is_feature(name.as_str()) {
            continue;
        }
        let partner = retained
            .iter()
            .copied()
            .find(|&i| matrix.values[[i, j]] > threshold);
        match partner {
            Some(i) => dropped.push(CorrelatedPair {
                dropped: name.clone(),
                kept: matrix.names[i].clone(),
                r: matrix.values[[i, j]],
            }),
            None => retained.push(j),
        }
    }
    dropped
}

fn indicator_correlations(
    matrix: &CorrelationMatrix,
    is_feature: impl Fn(&str) -> bool,
    indicators: &[String],
) -> Vec<IndicatorCorrelation> {
    indicators
        .iter()
        .filter_map(|ind| {
            let i = matrix.index_of(ind)?;
            matrix
                .names
                .iter()
                .enumerate()
                .filter(|(_, n)| is_feature(n.as_str()))
                .map(|(j, n)| (n, matrix.values[[i, j]]))
                .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(n, r)| IndicatorCorrelation {
                    indicator: ind.clone(),
                    feature: n.clone(),
                    r,
                })
        })
        .collect()
}

pub fn prune_correlated(table: &FeatureTable, order: ColumnOrder, threshold: f64) -> CorrelationOutcome {
    let matrix = CorrelationMatrix::compute(table, &order);
    let is_feature = |n: &str| table.role_of(n) == Some(ColumnRole::Feature);
    let dropped = correlated_features(&matrix, is_feature, threshold);
    let indicators = table.names_where(|s| s.role == ColumnRole::Diagnostic);
    let indicators = indicator_correlations(&matrix, is_feature, &indicators);

    let names: Vec<String> = dropped.iter().map(|p| p.dropped.clone()).collect();
    let (out, _, _) = table.without_columns(&names);
    info!(
        order_version = order.version,
        considered = matrix.names.len(),
        dropped = ?names,
        "correlation pruning complete"
    );
    CorrelationOutcome {
        table: out,
        order,
        dropped,
        indicators,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::pearson;
    use crate::table::test_support::*;

    #[test]
    fn drops_later_member_of_pair() {
        let t = table(vec![
            num("a", &[1.0, 2.0, 3.0, 4.0]),
            num("b", &[2.0, 4.1, 6.0, 8.2]),
            num("c", &[4.0, 1.0, 3.0, 2.0]),
        ]);
        let out = prune_correlated(&t, ColumnOrder::from_table(&t), 0.9);
        assert_eq!(out.table.names(), vec!["a".to_string(), "c".to_string()]);
        assert_eq!(out.dropped[0].kept, "a");
    }

    #[test]
    fn ordering_decides_which_member_survives() {
        let t = table(vec![num("a", &[1.0, 2.0, 3.0, 4.0]), num("b", &[2.0, 4.0, 6.0, 8.0])]);
        let order = ColumnOrder::new(vec!["b".into(), "a".into()]);
        let out = prune_correlated(&t, order, 0.9);
        assert_eq!(out.table.names(), vec!["b".to_string()]);
    }

    #[test]
    fn chain_never_drops_both_members_of_a_pair() {
        // a~b and b~c are above threshold, a~c is not
        let a = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let b = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 7.0, 6.0];
        let c = [0.0, 1.0, 2.0, 3.0, 5.0, 4.0, 7.0, 6.0];
        let t = table(vec![num("a", &a), num("b", &b), num("c", &c)]);
        let m = CorrelationMatrix::compute(&t, &ColumnOrder::from_table(&t));
        let threshold = m.get("a", "c").unwrap() + 1e-9;
        assert!(m.get("a", "b").unwrap() > threshold && m.get("b", "c").unwrap() > threshold);
        let out = prune_correlated(&t, ColumnOrder::from_table(&t), threshold);
        assert_eq!(out.table.names(), vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn retained_pairs_respect_threshold() {
        let cols: Vec<Vec<f64>> = (0..6)
            .map(|k| (0..20).map(|i| ((i * (k + 1)) % 7) as f64 + (i as f64) * (k % 2) as f64).collect())
            .collect();
        let t = table(
            cols.iter()
                .enumerate()
                .map(|(k, v)| num(&format!("f{}", k), v))
                .collect(),
        );
        let out = prune_correlated(&t, ColumnOrder::from_table(&t), 0.9);
        let kept = out.table.names();
        for i in 0..kept.len() {
            for j in (i + 1)..kept.len() {
                let a = out.table.column(&kept[i]).unwrap().dense().unwrap();
                let b = out.table.column(&kept[j]).unwrap().dense().unwrap();
                assert!(pearson(&a, &b).abs() <= 0.9);
            }
        }
    }

    #[test]
    fn constant_column_never_correlates() {
        let t = table(vec![num("a", &[1.0, 2.0, 3.0]), num("flat", &[5.0, 5.0, 5.0])]);
        let m = CorrelationMatrix::compute(&t, &ColumnOrder::from_table(&t));
        assert_eq!(m.get("a", "flat"), Some(0.0));
        assert_eq!(m.get("flat", "flat"), Some(1.0));
    }
}
