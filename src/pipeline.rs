//! Stage orchestration: raw files → cleaned table, artifact bundle, report.
//!
//! Stages run strictly in order and each consumes the previous stage's
//! table. The rebalanced matrices are a training view only; the table that
//! is written is the pruned, un-resampled one.

use crate::artifacts::ArtifactBundle;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::ingest::{self, AttackCategorySource};
use crate::logging::{StageEvent, StructuredLogger};
use crate::model::RandomForest;
use crate::persist::stage_table;
use crate::rebalance::Rebalancer;
use crate::report::{PipelineReport, REPORTED_IMPORTANCES};
use crate::schema::{ColumnRole, Schema};
use crate::stages::{correlation, dedup, encoding, label, outliers, repair, scaling, selection, ColumnOrder};
use crate::table::FeatureTable;
use ndarray::Axis;
use std::collections::BTreeMap;
use tracing::{info, warn};
use uuid::Uuid;

/// Everything one run produces, before or after persistence.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub table: FeatureTable,
    pub bundle: ArtifactBundle,
    pub report: PipelineReport,
}

pub struct Pipeline {
    config: PipelineConfig,
}

fn log_stage(stage: &str, table: &FeatureTable, dropped: Option<&[String]>, note: Option<&str>) {
    StructuredLogger::stage(&StageEvent {
        stage,
        rows: table.n_rows(),
        columns: table.n_cols(),
        dropped,
        note,
    });
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage and write the table, bundle and (optionally) report.
    /// Nothing is written unless every stage succeeds, and no output is moved
    /// into place until table and bundle are both staged on disk.
    pub fn run(&self) -> Result<PipelineOutput> {
        let mut output = self.prepare()?;
        let out = &self.config.output;
        let bundle = output.bundle.stage(&out.bundle_path)?;
        let table = stage_table(&output.table, &out.table_path)?;
        table.commit()?;
        output.report.rows_written = output.table.n_rows();
        info!(path = %out.table_path.display(), rows = output.report.rows_written, "table written");
        output.report.bundle_sha256 = Some(bundle.commit()?);
        output.report.finish();
        if let Some(path) = &out.report_path {
            output.report.save(path)?;
            info!(path = %path.display(), "run report written");
        }
        Ok(output)
    }

    /// Run every stage in memory without touching the output paths.
    pub fn prepare(&self) -> Result<PipelineOutput> {
        let cfg = &self.config;
        let attack = cfg.schema.attack_column.as_str();
        let label_column = cfg.schema.label_column.as_str();
        let run_id = Uuid::new_v4();

        // ingestion: a schema mismatch aborts before any transform
        let files = ingest::discover_raw_files(&cfg.inputs)?;
        let definitions = ingest::read_feature_definitions(&cfg.inputs.feature_definitions)?;
        let schema = Schema::declare(&ingest::canonical_columns(&definitions, &cfg.schema), &cfg.schema)?;
        let raw = ingest::load_raw(&files, &schema)?;
        let source = AttackCategorySource::read(&files, &schema, attack)?;
        info!(%run_id, files = files.len(), rows = raw.n_rows(), columns = raw.n_cols(), "ingestion complete");

        let mut report = PipelineReport::new(run_id, files);
        report.rows_ingested = raw.n_rows();

        let repaired = repair::repair(&raw, &source, attack)?;
        let failed: usize = repaired.coercion_failures.values().sum();
        let note = format!("{} uncastable cells, {} columns imputed", failed, repaired.imputed.len());
        log_stage("repair", &repaired.table, None, Some(note.as_str()));
        report.coercion_failures = repaired.coercion_failures;
        report.imputed_medians = repaired.imputed;

        let deduped = dedup::prune_and_dedup(&repaired.table);
        let note = format!("{} duplicate rows removed", deduped.duplicates_removed());
        log_stage("dedup", &deduped.table, Some(deduped.dropped_columns.as_slice()), Some(note.as_str()));
        report.duplicates_removed = deduped.duplicates_removed();
        report.rows_after_dedup = deduped.rows_after;
        report.identifier_columns_dropped = deduped.dropped_columns;

        let labeled = label::derive_labels(&deduped.table, attack, label_column)?;
        let note = format!("{} normal, {} attack", labeled.counts.negatives, labeled.counts.positives);
        log_stage("label", &labeled.table, None, Some(note.as_str()));
        report.class_counts = labeled.counts;

        let o = &cfg.outliers;
        let clipped = outliers::control_outliers(
            &labeled.table,
            &o.clip_columns,
            o.lower_quantile,
            o.upper_quantile,
            o.iqr_multiplier,
        );
        log_stage("outliers", &clipped.table, None, None);
        report.iqr_outliers_before = clipped.fences_before.iter().map(|(k, f)| (k.clone(), f.outliers)).collect();
        report.iqr_outliers_after = clipped.fences_after.iter().map(|(k, f)| (k.clone(), f.outliers)).collect();
        report.clip_bounds = clipped.clip_bounds;
        report.absent_clip_columns = clipped.absent;

        let encoded = encoding::encode_categoricals(&clipped.table, attack);
        log_stage("encoding", &encoded.table, None, None);

        let (scaled, scaler) = scaling::fit_transform(&encoded.table);
        log_stage("scaling", &scaled, None, None);

        let pruned = correlation::prune_correlated(
            &scaled,
            ColumnOrder::from_table(&scaled),
            cfg.correlation.threshold,
        );
        let corr_dropped: Vec<String> = pruned.dropped.iter().map(|p| p.dropped.clone()).collect();
        let note = format!("column order v{}", pruned.order.version);
        log_stage("correlation", &pruned.table, Some(corr_dropped.as_slice()), Some(note.as_str()));
        report.column_order_version = pruned.order.version;
        report.correlated_drops = pruned.dropped;
        report.indicator_correlations = pruned.indicators;

        // (X, y): numeric features only; label, attack_cat_label and the
        // indicator columns are not features
        let candidates = pruned.table.numeric_feature_names();
        let (x, x_names) = pruned.table.matrix(&candidates);
        let y = pruned
            .table
            .labels(label_column)
            .ok_or_else(|| PipelineError::Schema(format!("no numeric {:?} column", label_column)))?;
        let (x_bal, y_bal, summary) = Rebalancer::new(&cfg.rebalance).fit_resample(&x, &y)?;
        report.rebalance = summary;

        let ranker = RandomForest::fit(&x_bal, &y_bal, x_names.clone(), &cfg.forest)?;
        let ranking = ranker.ranking();
        report.top_importances = ranking.top(REPORTED_IMPORTANCES).to_vec();

        let selected = selection::select_features(&pruned.table, &ranking, &cfg.selection, label_column);
        report.low_importance_dropped = selected.low_importance;
        report.denylist_dropped = selected.denylisted;
        report.already_absent = selected.already_absent;

        let table = selection::finalize(&selected.table, label_column, cfg.output.include_attack_cat_label);
        let features = table.names_where(|s| s.role == ColumnRole::Feature);
        log_stage("selection", &table, None, None);
        report.final_columns = table.names();
        report.final_features = features.clone();

        let classifier = if !cfg.training.train_classifier {
            None
        } else if features.is_empty() {
            warn!("no features survived selection; classifier not trained");
            None
        } else {
            let idx: Vec<usize> = features
                .iter()
                .filter_map(|f| x_names.iter().position(|n| n == f))
                .collect();
            let x_final = x_bal.select(Axis(1), &idx);
            let model = RandomForest::fit(&x_final, &y_bal, features.clone(), &cfg.forest)?;
            info!(trees = model.n_trees(), features = features.len(), "final classifier trained");
            Some(model)
        };
        report.classifier_trained = classifier.is_some();

        let encoders: BTreeMap<_, _> = encoded
            .encoders
            .into_iter()
            .filter(|(name, _)| features.contains(name))
            .collect();
        let bundle = ArtifactBundle::new(
            run_id,
            features,
            encoders,
            encoded.attack_encoder,
            scaler,
            cfg.training.decision_threshold,
            classifier,
        );

        Ok(PipelineOutput { table, bundle, report })
    }
}
