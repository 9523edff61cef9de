//! Binary label derivation from the attack category.

use super::repair::NORMAL;
use crate::error::{PipelineError, Result};
use crate::schema::{ColumnKind, ColumnRole, ColumnSpec};
use crate::table::{Column, FeatureTable};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub negatives: usize,
    pub positives: usize,
}

impl ClassCounts {
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a u8>) -> Self {
        let mut c = ClassCounts::default();
        for &l in labels {
            if l == 1 {
                c.positives += 1;
            } else {
                c.negatives += 1;
            }
        }
        c
    }

    pub fn total(&self) -> usize {
        self.negatives + self.positives
    }
}

#[derive(Debug, Clone)]
pub struct LabelOutcome {
    pub table: FeatureTable,
    pub counts: ClassCounts,
}

/// `label = 0` iff the trimmed attack category is `Normal`. A table with no
/// positive rows cannot be rebalanced or ranked, so it is rejected.
pub fn derive_labels(table: &FeatureTable, attack_column: &str, label_column: &str) -> Result<LabelOutcome> {
    let categories = table
        .column(attack_column)
        .and_then(|c| c.as_text())
        .ok_or_else(|| PipelineError::Schema(format!("no text column {:?}", attack_column)))?;

    let labels: Vec<u8> = categories.iter().map(|c| u8::from(c.trim() != NORMAL)).collect();
    let counts = ClassCounts::from_labels(&labels);
    if counts.positives == 0 {
        return Err(PipelineError::EmptyClass { label: 1 });
    }

    let spec = table
        .column(label_column)
        .map(|c| ColumnSpec::new(c.spec.name.clone(), ColumnKind::Numeric, c.spec.role))
        .unwrap_or_else(|| ColumnSpec::new(label_column, ColumnKind::Numeric, ColumnRole::Target));
    let column = Column::numeric(spec, labels.into_iter().map(|l| Some(l as f64)).collect());
    Ok(LabelOutcome {
        table: table.with_column(column),
        counts,
    })
}
