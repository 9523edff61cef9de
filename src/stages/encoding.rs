//! Categorical encoding: per-column string → code bijections, the auxiliary
//! `attack_cat_label`, and one-hot `attack_*` indicators for diagnostics.

use crate::schema::{ColumnKind, ColumnRole, ColumnSpec};
use crate::table::{Column, FeatureTable};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

pub const ATTACK_LABEL_COLUMN: &str = "attack_cat_label";
pub const ONE_HOT_PREFIX: &str = "attack_";

/// Bijection between the distinct values observed at fit time and 0..k−1.
/// Classes are sorted, so the mapping does not depend on row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    pub column: String,
    classes: Vec<String>,
}

impl CategoryEncoder {
    pub fn fit<'a>(column: impl Into<String>, values: impl IntoIterator<Item = &'a String>) -> Self {
        let classes: BTreeSet<&String> = values.into_iter().collect();
        Self {
            column: column.into(),
            classes: classes.into_iter().cloned().collect(),
        }
    }

    /// `None` for a value unseen at fit time; callers decide how to fail.
    pub fn encode(&self, value: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }

    pub fn decode(&self, code: usize) -> Option<&str> {
        self.classes.get(code).map(String::as_str)
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct EncodingOutcome {
    pub table: FeatureTable,
    /// Encoders for categorical feature columns
    pub encoders: BTreeMap<String, CategoryEncoder>,
    pub attack_encoder: CategoryEncoder,
    pub one_hot_columns: Vec<String>,
}

fn codes(encoder: &CategoryEncoder, values: &[String]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| encoder.encode(v).map(|c| c as f64))
        .collect()
}

/// Encode every categorical feature column in place (kind becomes `Encoded`),
/// add `attack_cat_label`, and append one indicator column per attack class.
/// The text attack column itself is kept for later pruning.
pub fn encode_categoricals(table: &FeatureTable, attack_column: &str) -> EncodingOutcome {
    let mut out = table.clone();
    let mut encoders = BTreeMap::new();

    for column in table.columns() {
        if column.spec.role != ColumnRole::Feature || column.spec.kind != ColumnKind::Categorical {
            continue;
        }
        let Some(values) = column.as_text() else {
            continue;
        };
        let encoder = CategoryEncoder::fit(column.spec.name.clone(), values);
        let spec = ColumnSpec::new(column.spec.name.clone(), ColumnKind::Encoded, ColumnRole::Feature);
        out.set_column(Column::numeric(spec, codes(&encoder, values)));
        encoders.insert(column.spec.name.clone(), encoder);
    }

    let attack_values: Vec<String> = table
        .column(attack_column)
        .and_then(|c| c.as_text())
        .map(|v| v.to_vec())
        .unwrap_or_default();
    let attack_encoder = CategoryEncoder::fit(attack_column, &attack_values);
    out.set_column(Column::numeric(
        ColumnSpec::new(ATTACK_LABEL_COLUMN, ColumnKind::Encoded, ColumnRole::Target),
        codes(&attack_encoder, &attack_values),
    ));

    let mut one_hot_columns = Vec::with_capacity(attack_encoder.len());
    for class in attack_encoder.classes() {
        let name = format!("{}{}", ONE_HOT_PREFIX, class);
        let indicator = attack_values
            .iter()
            .map(|v| Some(if v == class { 1.0 } else { 0.0 }))
            .collect();
        out.set_column(Column::numeric(
            ColumnSpec::new(name.clone(), ColumnKind::Numeric, ColumnRole::Diagnostic),
            indicator,
        ));
        one_hot_columns.push(name);
    }

    info!(
        encoded = encoders.len(),
        attack_classes = attack_encoder.len(),
        "categorical encoding complete"
    );
    EncodingOutcome {
        table: out,
        encoders,
        attack_encoder,
        one_hot_columns,
    }
}
