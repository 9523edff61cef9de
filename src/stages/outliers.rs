//! Outlier control. IQR fences are diagnostic only; percentile clipping of a
//! fixed heavy-tailed column list is the only mutation.

use crate::stats::{quantile, sorted_present};
use crate::table::{Column, FeatureTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IqrFence {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
    /// Cells outside the fences
    pub outliers: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipBounds {
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone)]
pub struct OutlierOutcome {
    pub table: FeatureTable,
    pub fences_before: BTreeMap<String, IqrFence>,
    pub fences_after: BTreeMap<String, IqrFence>,
    pub clip_bounds: BTreeMap<String, ClipBounds>,
    /// Configured clip columns not present in the table
    pub absent: Vec<String>,
}

/// Per numeric feature column `Q1 − k·IQR`, `Q3 + k·IQR`, with outlier counts.
/// Never touches the data.
pub fn iqr_fences(table: &FeatureTable, multiplier: f64) -> BTreeMap<String, IqrFence> {
    let mut out = BTreeMap::new();
    for column in table.columns() {
        if !column.spec.is_numeric_feature() {
            continue;
        }
        let Some(values) = column.as_numeric() else {
            continue;
        };
        let sorted = sorted_present(values);
        let (Some(q1), Some(q3)) = (quantile(&sorted, 0.25), quantile(&sorted, 0.75)) else {
            continue;
        };
        let iqr = q3 - q1;
        let lower = q1 - multiplier * iqr;
        let upper = q3 + multiplier * iqr;
        let outliers = sorted.iter().filter(|v| **v < lower || **v > upper).count();
        out.insert(
            column.spec.name.clone(),
            IqrFence {
                q1,
                q3,
                lower,
                upper,
                outliers,
            },
        );
    }
    out
}

/// Clip each listed numeric column to its own `[q_lo, q_hi]` percentiles,
/// computed on the column before clipping.
pub fn clip_percentiles(
    table: &FeatureTable,
    columns: &[String],
    lower_q: f64,
    upper_q: f64,
) -> (FeatureTable, BTreeMap<String, ClipBounds>, Vec<String>) {
    let mut out = table.clone();
    let mut bounds = BTreeMap::new();
    let mut absent = Vec::new();
    for name in columns {
        let Some(column) = table.column(name) else {
            absent.push(name.clone());
            continue;
        };
        let Some(values) = column.as_numeric() else {
            debug!(column = %name, "clip column is not numeric; skipped");
            continue;
        };
        let sorted = sorted_present(values);
        let (Some(lower), Some(upper)) = (quantile(&sorted, lower_q), quantile(&sorted, upper_q)) else {
            continue;
        };
        let clipped = values.iter().map(|v| v.map(|x| x.clamp(lower, upper))).collect();
        out.set_column(Column::numeric(column.spec.clone(), clipped));
        bounds.insert(name.clone(), ClipBounds { lower, upper });
    }
    (out, bounds, absent)
}

pub fn control_outliers(
    table: &FeatureTable,
    clip_columns: &[String],
    lower_q: f64,
    upper_q: f64,
    iqr_multiplier: f64,
) -> OutlierOutcome {
    let fences_before = iqr_fences(table, iqr_multiplier);
    let (clipped, clip_bounds, absent) = clip_percentiles(table, clip_columns, lower_q, upper_q);
    let fences_after = iqr_fences(&clipped, iqr_multiplier);
    if !absent.is_empty() {
        debug!(?absent, "clip columns not present");
    }
    let before: usize = fences_before.values().map(|f| f.outliers).sum();
    let after: usize = fences_after.values().map(|f| f.outliers).sum();
    info!(
        clipped_columns = clip_bounds.len(),
        iqr_outliers_before = before,
        iqr_outliers_after = after,
        "outlier control complete"
    );
    OutlierOutcome {
        table: clipped,
        fences_before,
        fences_after,
        clip_bounds,
        absent,
    }
}
