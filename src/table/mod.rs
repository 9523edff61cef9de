//! Columnar in-memory feature table. Stages never mutate a table they are
//! handed; they build and return a new one.

use crate::schema::{ColumnKind, ColumnRole, ColumnSpec};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Stable identity of a raw row: which source file and which record in it.
/// Survives filtering and deduplication, so joins never rely on position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey {
    pub source: u32,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// `None` is a missing value
    Numeric(Vec<Option<f64>>),
    Text(Vec<String>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn select(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub spec: ColumnSpec,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(spec: ColumnSpec, values: Vec<Option<f64>>) -> Self {
        Self {
            spec,
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(spec: ColumnSpec, values: Vec<String>) -> Self {
        Self {
            spec,
            data: ColumnData::Text(values),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&[String]> {
        match &self.data {
            ColumnData::Text(v) => Some(v),
            ColumnData::Numeric(_) => None,
        }
    }

    /// Numeric values with missing cells read as 0.0.
    pub fn dense(&self) -> Option<Vec<f64>> {
        self.as_numeric().map(|v| v.iter().map(|x| x.unwrap_or(0.0)).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureTable {
    columns: Vec<Column>,
    keys: Vec<RowKey>,
}

impl FeatureTable {
    /// Build a table; every column must have one cell per key.
    pub fn new(columns: Vec<Column>, keys: Vec<RowKey>) -> Result<Self, String> {
        for c in &columns {
            if c.data.len() != keys.len() {
                return Err(format!(
                    "column {} has {} rows, expected {}",
                    c.name(),
                    c.data.len(),
                    keys.len()
                ));
            }
        }
        Ok(Self { columns, keys })
    }

    pub fn n_rows(&self) -> usize {
        self.keys.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn keys(&self) -> &[RowKey] {
        &self.keys
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.spec.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.spec.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn names_where(&self, pred: impl Fn(&ColumnSpec) -> bool) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| pred(&c.spec))
            .map(|c| c.spec.name.clone())
            .collect()
    }

    /// Numeric feature columns (raw numeric or encoded), in table order.
    pub fn numeric_feature_names(&self) -> Vec<String> {
        self.names_where(|s| s.is_numeric_feature())
    }

    /// Copy with `column` replacing the same-named column, or appended.
    pub fn with_column(&self, column: Column) -> Self {
        let mut out = self.clone();
        out.set_column(column);
        out
    }

    pub(crate) fn set_column(&mut self, column: Column) {
        debug_assert_eq!(column.data.len(), self.keys.len());
        match self.columns.iter_mut().find(|c| c.spec.name == column.spec.name) {
            Some(slot) => *slot = column,
            None => self.columns.push(column),
        }
    }

    /// Copy with the named columns removed. Returns the names actually removed
    /// and the names that were already absent.
    pub fn without_columns(&self, names: &[String]) -> (Self, Vec<String>, Vec<String>) {
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        let mut removed = Vec::new();
        let columns = self
            .columns
            .iter()
            .filter(|c| {
                if wanted.contains(c.name()) {
                    removed.push(c.spec.name.clone());
                    false
                } else {
                    true
                }
            })
            .cloned()
            .collect();
        let mut seen = HashSet::new();
        let absent = names
            .iter()
            .filter(|n| !self.contains(n) && seen.insert(n.as_str()))
            .cloned()
            .collect();
        (
            Self {
                columns,
                keys: self.keys.clone(),
            },
            removed,
            absent,
        )
    }

    /// Copy keeping only the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    spec: c.spec.clone(),
                    data: c.data.select(rows),
                })
                .collect(),
            keys: rows.iter().map(|&i| self.keys[i]).collect(),
        }
    }

    /// Row-major matrix of the named numeric columns (missing read as 0.0).
    /// Names that are absent or non-numeric are skipped.
    pub fn matrix(&self, names: &[String]) -> (Array2<f64>, Vec<String>) {
        let cols: Vec<(String, Vec<f64>)> = names
            .iter()
            .filter_map(|n| self.column(n).and_then(|c| c.dense().map(|d| (n.clone(), d))))
            .collect();
        let mut m = Array2::<f64>::zeros((self.n_rows(), cols.len()));
        for (j, (_, values)) in cols.iter().enumerate() {
            for (i, v) in values.iter().enumerate() {
                m[[i, j]] = *v;
            }
        }
        (m, cols.into_iter().map(|(n, _)| n).collect())
    }

    /// Binary label vector read from a numeric column (anything but 1 is 0).
    pub fn labels(&self, name: &str) -> Option<Array1<u8>> {
        self.column(name)?
            .as_numeric()
            .map(|v| v.iter().map(|x| u8::from(*x == Some(1.0))).collect())
    }

    pub fn role_of(&self, name: &str) -> Option<ColumnRole> {
        self.column(name).map(|c| c.spec.role)
    }

    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.column(name).map(|c| c.spec.kind)
    }
}
