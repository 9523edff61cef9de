//! Authoritative attack-category values, re-read from the untouched raw
//! files and keyed by `RowKey` so restoration survives row removal.

use super::decode_field;
use crate::error::{PipelineError, Result};
use crate::schema::Schema;
use crate::table::RowKey;
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct AttackCategorySource {
    by_key: HashMap<RowKey, String>,
}

impl AttackCategorySource {
    /// Re-read the attack column of every raw file. Any read failure is
    /// `MissingData`: labels cannot be trusted without this source.
    pub fn read(files: &[PathBuf], schema: &Schema, attack_column: &str) -> Result<Self> {
        let idx = schema.index_of(attack_column).ok_or_else(|| {
            PipelineError::Schema(format!("schema has no {:?} column", attack_column))
        })?;
        let mut by_key = HashMap::new();
        for (source, path) in files.iter().enumerate() {
            let missing = |reason: String| PipelineError::MissingData {
                path: path.clone(),
                reason,
            };
            let mut reader = ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_path(path)
                .map_err(|e| missing(e.to_string()))?;
            for (line, record) in reader.byte_records().enumerate() {
                let record = record.map_err(|e| missing(e.to_string()))?;
                let value = record.get(idx).map(decode_field).unwrap_or_default();
                by_key.insert(
                    RowKey {
                        source: source as u32,
                        line: line as u64,
                    },
                    value,
                );
            }
        }
        Ok(Self { by_key })
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (RowKey, String)>) -> Self {
        Self {
            by_key: pairs.into_iter().collect(),
        }
    }

    pub fn get(&self, key: &RowKey) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}
