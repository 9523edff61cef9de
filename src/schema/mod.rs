//! Per-column type and role declaration, fixed once at ingestion and
//! consumed by every later stage instead of being re-inferred.

use crate::config::SchemaConfig;
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    /// Integer codes of a categorical column
    Encoded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    /// Model input
    Feature,
    /// Raw identifier or leak; never encoded, scaled or modelled
    Identifier,
    /// `label`, `attack_cat`, `attack_cat_label`
    Target,
    /// Analysis-only columns (one-hot attack indicators)
    Diagnostic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
    pub role: ColumnRole,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind, role: ColumnRole) -> Self {
        Self {
            name: name.into(),
            kind,
            role,
        }
    }

    /// Feature column that can be read as a number (raw numeric or encoded)
    pub fn is_numeric_feature(&self) -> bool {
        self.role == ColumnRole::Feature && self.kind != ColumnKind::Categorical
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Schema {
    /// Declare kind + role for the canonical names. The label column must be
    /// last and the attack column must be present; names must be unique.
    pub fn declare(names: &[String], config: &SchemaConfig) -> Result<Self> {
        let mut seen = HashSet::new();
        for name in names {
            if !seen.insert(name.as_str()) {
                return Err(PipelineError::Schema(format!("duplicate column name {:?}", name)));
            }
        }
        if names.last() != Some(&config.label_column) {
            return Err(PipelineError::Schema(format!(
                "last column must be {:?}",
                config.label_column
            )));
        }
        if !seen.contains(config.attack_column.as_str()) {
            return Err(PipelineError::Schema(format!(
                "feature definitions do not declare {:?}",
                config.attack_column
            )));
        }

        let columns = names
            .iter()
            .map(|name| {
                let (kind, role) = if *name == config.label_column {
                    (ColumnKind::Numeric, ColumnRole::Target)
                } else if *name == config.attack_column {
                    (ColumnKind::Categorical, ColumnRole::Target)
                } else if config.identifiers.contains(name) {
                    let kind = if config.categorical.contains(name) {
                        ColumnKind::Categorical
                    } else {
                        ColumnKind::Numeric
                    };
                    (kind, ColumnRole::Identifier)
                } else if config.categorical.contains(name) {
                    (ColumnKind::Categorical, ColumnRole::Feature)
                } else {
                    (ColumnKind::Numeric, ColumnRole::Feature)
                };
                ColumnSpec::new(name.clone(), kind, role)
            })
            .collect();
        Ok(Self { columns })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }
}
