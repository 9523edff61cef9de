//! Min-max scaling of raw numeric feature columns to [0, 1].

use crate::schema::{ColumnKind, ColumnRole};
use crate::table::{Column, FeatureTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureBounds {
    pub min: f64,
    pub max: f64,
}

impl FeatureBounds {
    /// Values outside the fitted range map outside [0, 1]; a constant
    /// column maps everything to 0.
    pub fn scale(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range.abs() <= f64::EPSILON {
            0.0
        } else {
            (value - self.min) / range
        }
    }
}

/// Fitted per-column bounds. Only numeric feature columns are scaled:
/// targets and encoded categoricals keep their integer codes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    bounds: BTreeMap<String, FeatureBounds>,
}

impl MinMaxScaler {
    pub fn fit(table: &FeatureTable) -> Self {
        let mut bounds = BTreeMap::new();
        for column in table.columns() {
            if column.spec.role != ColumnRole::Feature || column.spec.kind != ColumnKind::Numeric {
                continue;
            }
            let Some(values) = column.as_numeric() else {
                continue;
            };
            let mut present = values.iter().flatten().copied();
            let Some(first) = present.next() else {
                continue;
            };
            let (min, max) = present.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
            if min == max {
                debug!(column = %column.spec.name, "constant column scales to 0");
            }
            bounds.insert(column.spec.name.clone(), FeatureBounds { min, max });
        }
        Self { bounds }
    }

    pub fn bounds(&self, column: &str) -> Option<FeatureBounds> {
        self.bounds.get(column).copied()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.bounds.keys().map(String::as_str)
    }

    /// Scale one value; columns the scaler was not fitted on pass through.
    pub fn transform_value(&self, column: &str, value: f64) -> f64 {
        match self.bounds.get(column) {
            Some(b) => b.scale(value),
            None => value,
        }
    }

    pub fn transform(&self, table: &FeatureTable) -> FeatureTable {
        let mut out = table.clone();
        for (name, b) in &self.bounds {
            let Some(column) = table.column(name) else {
                continue;
            };
            let Some(values) = column.as_numeric() else {
                continue;
            };
            let scaled = values.iter().map(|v| v.map(|x| b.scale(x))).collect();
            out.set_column(Column::numeric(column.spec.clone(), scaled));
        }
        out
    }
}

pub fn fit_transform(table: &FeatureTable) -> (FeatureTable, MinMaxScaler) {
    let scaler = MinMaxScaler::fit(table);
    let out = scaler.transform(table);
    info!(scaled_columns = scaler.bounds.len(), "scaling complete");
    (out, scaler)
}
