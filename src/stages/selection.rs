//! Importance- and denylist-based column removal, plus the final column set
//! written to disk.

use super::encoding::ATTACK_LABEL_COLUMN;
use crate::config::SelectionConfig;
use crate::model::FeatureImportanceRanking;
use crate::schema::ColumnRole;
use crate::table::FeatureTable;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct SelectionOutcome {
    pub table: FeatureTable,
    pub low_importance: Vec<String>,
    pub denylisted: Vec<String>,
    /// Candidates an earlier stage already removed
    pub already_absent: Vec<String>,
}

/// Remove features below the importance threshold and every denylisted
/// column. Absent candidates are skipped, so running this twice is a no-op.
/// The label column is never removed.
pub fn select_features(
    table: &FeatureTable,
    ranking: &FeatureImportanceRanking,
    config: &SelectionConfig,
    label_column: &str,
) -> SelectionOutcome {
    let low: Vec<String> = ranking
        .below(config.importance_threshold)
        .into_iter()
        .filter(|n| n != label_column)
        .collect();
    let (after_low, low_importance, mut already_absent) = table.without_columns(&low);

    let deny: Vec<String> = config
        .denylist
        .iter()
        .filter(|n| *n != label_column)
        .cloned()
        .collect();
    let (out, denylisted, absent_deny) = after_low.without_columns(&deny);
    for name in absent_deny {
        if !low_importance.contains(&name) && !already_absent.contains(&name) {
            already_absent.push(name);
        }
    }
    if !already_absent.is_empty() {
        debug!(?already_absent, "selection candidates already absent");
    }
    info!(
        low_importance = ?low_importance,
        denylisted = ?denylisted,
        "feature selection complete"
    );
    SelectionOutcome {
        table: out,
        low_importance,
        denylisted,
        already_absent,
    }
}

/// Columns shipped downstream: remaining features, then `label`, then
/// `attack_cat_label` when requested. Diagnostics and raw text targets go.
pub fn finalize(table: &FeatureTable, label_column: &str, include_attack_label: bool) -> FeatureTable {
    let mut drop: Vec<String> = table.names_where(|s| {
        s.role == ColumnRole::Diagnostic
            || s.role == ColumnRole::Identifier
            || (s.role == ColumnRole::Target && s.name != label_column && s.name != ATTACK_LABEL_COLUMN)
            || (s.role == ColumnRole::Feature && !s.is_numeric_feature())
    });
    if !include_attack_label {
        drop.push(ATTACK_LABEL_COLUMN.to_string());
    }
    let (trimmed, _, _) = table.without_columns(&drop);

    let mut order = trimmed.names_where(|s| s.role == ColumnRole::Feature);
    order.push(label_column.to_string());
    if include_attack_label {
        order.push(ATTACK_LABEL_COLUMN.to_string());
    }
    reorder(&trimmed, &order)
}

fn reorder(table: &FeatureTable, order: &[String]) -> FeatureTable {
    let columns = order
        .iter()
        .filter_map(|n| table.column(n).cloned())
        .collect();
    FeatureTable::new(columns, table.keys().to_vec()).unwrap_or_else(|_| table.clone())
}
