//! Run report: what each stage saw and removed, written as JSON next to the
//! cleaned table when `output.report_path` is set.

use crate::error::Result;
use crate::persist::write_bytes_atomic;
use crate::rebalance::RebalanceSummary;
use crate::stages::correlation::{CorrelatedPair, IndicatorCorrelation};
use crate::stages::outliers::ClipBounds;
use crate::stages::ClassCounts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Entries of the importance ranking kept in the report
pub const REPORTED_IMPORTANCES: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub raw_files: Vec<PathBuf>,
    pub rows_ingested: usize,

    /// Uncastable numeric cells per column (set to missing, then imputed)
    pub coercion_failures: BTreeMap<String, usize>,
    pub imputed_medians: BTreeMap<String, f64>,

    pub identifier_columns_dropped: Vec<String>,
    pub duplicates_removed: usize,
    pub rows_after_dedup: usize,
    pub class_counts: ClassCounts,

    pub iqr_outliers_before: BTreeMap<String, usize>,
    pub iqr_outliers_after: BTreeMap<String, usize>,
    pub clip_bounds: BTreeMap<String, ClipBounds>,
    pub absent_clip_columns: Vec<String>,

    pub column_order_version: u32,
    pub correlated_drops: Vec<CorrelatedPair>,
    pub indicator_correlations: Vec<IndicatorCorrelation>,

    pub rebalance: RebalanceSummary,
    pub top_importances: Vec<(String, f64)>,
    pub low_importance_dropped: Vec<String>,
    pub denylist_dropped: Vec<String>,
    pub already_absent: Vec<String>,

    pub final_columns: Vec<String>,
    pub final_features: Vec<String>,
    pub rows_written: usize,
    pub classifier_trained: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_sha256: Option<String>,
}

impl PipelineReport {
    pub fn new(run_id: Uuid, raw_files: Vec<PathBuf>) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            finished_at: None,
            raw_files,
            rows_ingested: 0,
            coercion_failures: BTreeMap::new(),
            imputed_medians: BTreeMap::new(),
            identifier_columns_dropped: Vec::new(),
            duplicates_removed: 0,
            rows_after_dedup: 0,
            class_counts: ClassCounts::default(),
            iqr_outliers_before: BTreeMap::new(),
            iqr_outliers_after: BTreeMap::new(),
            clip_bounds: BTreeMap::new(),
            absent_clip_columns: Vec::new(),
            column_order_version: 0,
            correlated_drops: Vec::new(),
            indicator_correlations: Vec::new(),
            rebalance: RebalanceSummary::default(),
            top_importances: Vec::new(),
            low_importance_dropped: Vec::new(),
            denylist_dropped: Vec::new(),
            already_absent: Vec::new(),
            final_columns: Vec::new(),
            final_features: Vec::new(),
            rows_written: 0,
            classifier_trained: false,
            bundle_sha256: None,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(self)?;
        write_bytes_atomic(path, &bytes)
    }
}
