//! Type coercion, attack-category restoration and median imputation.

use crate::error::{PipelineError, Result};
use crate::ingest::AttackCategorySource;
use crate::schema::{ColumnKind, ColumnRole};
use crate::stats;
use crate::table::{Column, ColumnData, FeatureTable};
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const NORMAL: &str = "Normal";

#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub table: FeatureTable,
    /// Non-empty cells per column that failed numeric coercion
    pub coercion_failures: BTreeMap<String, usize>,
    /// Median used per column, for columns that had missing values
    pub imputed: BTreeMap<String, f64>,
}

/// Canonical attack category: trimmed, null spellings mapped to `Normal`,
/// the `Backdoor` spelling merged into `Backdoors`.
pub fn normalize_attack_category(raw: &str) -> String {
    match raw.trim() {
        "" | "nan" | "None" => NORMAL.to_string(),
        "Backdoor" => "Backdoors".to_string(),
        other => other.to_string(),
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric-kind columns are parsed; a failed cast becomes missing. Categorical
/// columns are forced to text even when the values look numeric. Identifier
/// columns are left as read.
pub fn coerce_types(table: &FeatureTable) -> (FeatureTable, BTreeMap<String, usize>) {
    let mut out = table.clone();
    let mut failures = BTreeMap::new();
    for column in table.columns() {
        if column.spec.role == ColumnRole::Identifier {
            continue;
        }
        let coerced = match (column.spec.kind, &column.data) {
            (ColumnKind::Numeric, ColumnData::Text(values)) => {
                let mut failed = 0usize;
                let parsed = values
                    .iter()
                    .map(|v| {
                        let p = parse_number(v);
                        if p.is_none() && !v.trim().is_empty() {
                            failed += 1;
                        }
                        p
                    })
                    .collect();
                if failed > 0 {
                    failures.insert(column.spec.name.clone(), failed);
                }
                Column::numeric(column.spec.clone(), parsed)
            }
            (ColumnKind::Categorical, ColumnData::Numeric(values)) => Column::text(
                column.spec.clone(),
                values
                    .iter()
                    .map(|v| v.map(|x| x.to_string()).unwrap_or_default())
                    .collect(),
            ),
            _ => continue,
        };
        out.set_column(coerced);
    }
    if !failures.is_empty() {
        debug!(?failures, "uncastable numeric cells set to missing");
    }
    (out, failures)
}

/// Replace the attack column with the authoritative source, joined by row key.
pub fn restore_attack_categories(
    table: &FeatureTable,
    source: &AttackCategorySource,
    attack_column: &str,
) -> Result<FeatureTable> {
    let column = table
        .column(attack_column)
        .ok_or_else(|| PipelineError::Schema(format!("table has no {:?} column", attack_column)))?;
    let mut restored = Vec::with_capacity(table.n_rows());
    for key in table.keys() {
        let raw = source.get(key).ok_or_else(|| PipelineError::MissingData {
            path: format!("source {} record {}", key.source, key.line).into(),
            reason: "row absent from attack-category source".into(),
        })?;
        restored.push(normalize_attack_category(raw));
    }
    Ok(table.with_column(Column::text(column.spec.clone(), restored)))
}

/// Fill missing numeric feature cells with the column median over the whole
/// table. A column with no present value at all is filled with 0.0.
pub fn impute_medians(table: &FeatureTable) -> (FeatureTable, BTreeMap<String, f64>) {
    let mut out = table.clone();
    let mut imputed = BTreeMap::new();
    for column in table.columns() {
        if column.spec.role != ColumnRole::Feature {
            continue;
        }
        let Some(values) = column.as_numeric() else {
            continue;
        };
        if values.iter().all(Option::is_some) {
            continue;
        }
        let fill = stats::median(values).unwrap_or_else(|| {
            warn!(column = %column.spec.name, "column has no numeric values; imputing 0");
            0.0
        });
        let filled = values.iter().map(|v| Some(v.unwrap_or(fill))).collect();
        out.set_column(Column::numeric(column.spec.clone(), filled));
        imputed.insert(column.spec.name.clone(), fill);
    }
    (out, imputed)
}

/// Coerce → restore attack categories → impute. Medians are taken from the
/// raw (unclipped) distribution.
pub fn repair(
    table: &FeatureTable,
    source: &AttackCategorySource,
    attack_column: &str,
) -> Result<RepairOutcome> {
    let (coerced, coercion_failures) = coerce_types(table);
    let restored = restore_attack_categories(&coerced, source, attack_column)?;
    let (table, imputed) = impute_medians(&restored);
    Ok(RepairOutcome {
        table,
        coercion_failures,
        imputed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSpec;
    use crate::table::RowKey;

    fn raw_table() -> FeatureTable {
        let keys: Vec<RowKey> = (0..4).map(|line| RowKey { source: 0, line }).collect();
        FeatureTable::new(
            vec![
                Column::text(
                    ColumnSpec::new("dur", ColumnKind::Numeric, ColumnRole::Feature),
                    vec!["1.0".into(), "x".into(), "3".into(), "5".into()],
                ),
                Column::text(
                    ColumnSpec::new("service", ColumnKind::Categorical, ColumnRole::Feature),
                    vec!["80".into(), "-".into(), "dns".into(), "-".into()],
                ),
                Column::text(
                    ColumnSpec::new("attack_cat", ColumnKind::Categorical, ColumnRole::Target),
                    vec!["garbage".into(); 4],
                ),
            ],
            keys,
        )
        .unwrap()
    }

    fn source() -> AttackCategorySource {
        AttackCategorySource::from_pairs(vec![
            (RowKey { source: 0, line: 0 }, "".to_string()),
            (RowKey { source: 0, line: 1 }, " Backdoor ".to_string()),
            (RowKey { source: 0, line: 2 }, "nan".to_string()),
            (RowKey { source: 0, line: 3 }, "Exploits".to_string()),
        ])
    }

    #[test]
    fn normalizes_categories() {
        assert_eq!(normalize_attack_category("None"), "Normal");
        assert_eq!(normalize_attack_category(" Fuzzers "), "Fuzzers");
        assert_eq!(normalize_attack_category("Backdoor"), "Backdoors");
    }

    #[test]
    fn uncastable_value_becomes_median() {
        let out = repair(&raw_table(), &source(), "attack_cat").unwrap();
        assert_eq!(out.coercion_failures.get("dur"), Some(&1));
        let dur = out.table.column("dur").unwrap().as_numeric().unwrap().to_vec();
        assert_eq!(dur, vec![Some(1.0), Some(3.0), Some(3.0), Some(5.0)]);
        assert_eq!(out.imputed.get("dur"), Some(&3.0));
        // categorical stays text
        assert!(out.table.column("service").unwrap().as_text().is_some());
    }

    #[test]
    fn identifier_and_label_columns_are_not_repaired() {
        let t = raw_table()
            .with_column(Column::text(
                ColumnSpec::new("srcip", ColumnKind::Numeric, ColumnRole::Identifier),
                vec!["10.0.0.1".into(), "10.0.0.2".into(), "10.0.0.3".into(), "x".into()],
            ))
            .with_column(Column::text(
                ColumnSpec::new("label", ColumnKind::Numeric, ColumnRole::Target),
                vec![String::new(); 4],
            ));
        let out = repair(&t, &source(), "attack_cat").unwrap();
        assert!(!out.coercion_failures.contains_key("srcip"));
        assert!(!out.imputed.contains_key("srcip"));
        assert!(!out.imputed.contains_key("label"));
        assert_eq!(out.coercion_failures.keys().collect::<Vec<_>>(), vec!["dur"]);
        assert!(out.table.column("srcip").unwrap().as_text().is_some());
    }

    #[test]
    fn restores_by_row_key_not_position() {
        let t = raw_table().select_rows(&[3, 1]);
        let out = repair(&t, &source(), "attack_cat").unwrap();
        let cats = out.table.column("attack_cat").unwrap().as_text().unwrap().to_vec();
        assert_eq!(cats, vec!["Exploits".to_string(), "Backdoors".to_string()]);
    }

    #[test]
    fn missing_source_row_is_fatal() {
        let empty = AttackCategorySource::default();
        let err = repair(&raw_table(), &empty, "attack_cat").unwrap_err();
        assert!(matches!(err, PipelineError::MissingData { .. }));
    }
}
