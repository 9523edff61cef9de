//! Raw capture ingestion: file discovery, feature-definition parsing,
//! column-count validation and concatenation under one canonical schema.

mod attack_source;

pub use attack_source::AttackCategorySource;

use crate::config::{InputConfig, SchemaConfig};
use crate::error::{PipelineError, Result};
use crate::schema::Schema;
use crate::table::{Column, FeatureTable, RowKey};
use csv::ReaderBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Explicit files first, then files discovered under `raw_dir`, deduplicated
/// and sorted so the concatenation order is reproducible.
pub fn discover_raw_files(config: &InputConfig) -> Result<Vec<PathBuf>> {
    let mut files = config.raw_files.clone();
    if let Some(dir) = &config.raw_dir {
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1).follow_links(false) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            let ext_ok = path
                .extension()
                .map(|e| e.eq_ignore_ascii_case(config.raw_extension.as_str()))
                .unwrap_or(false);
            if name.starts_with(config.raw_prefix.as_str()) && ext_ok {
                files.push(path.to_path_buf());
            }
        }
    }
    files.sort();
    files.dedup();
    if files.is_empty() {
        return Err(PipelineError::Schema("no raw capture files configured".into()));
    }
    debug!(count = files.len(), "raw capture files");
    Ok(files)
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Decode as UTF-8, falling back to Latin-1 (every byte maps to one char).
fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            debug!("feature definitions are not UTF-8; decoding as Latin-1");
            latin1(e.as_bytes())
        }
    }
}

/// One raw cell. Invalid UTF-8 is decoded as Latin-1 so the cell survives
/// and fails numeric coercion instead of aborting the read.
pub(crate) fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => latin1(bytes),
    }
}

/// Canonical names carry no whitespace ("ct_src_ ltm" → "ct_src_ltm").
pub fn normalize_name(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Read the ordinal → name mapping. The `Name` column is located by header
/// (case-insensitive); rows are ordered by `No.` when that column exists.
pub fn read_feature_definitions(path: &Path) -> Result<Vec<String>> {
    let bytes = std::fs::read(path).map_err(|e| PipelineError::MissingData {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let text = decode_text(bytes);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let find = |wanted: &str| {
        headers
            .iter()
            .position(|h| normalize_name(h).eq_ignore_ascii_case(wanted))
    };
    let name_idx = find("Name").ok_or_else(|| {
        PipelineError::Schema(format!("{}: no Name column in header", path.display()))
    })?;
    let ordinal_idx = find("No.");

    let mut rows: Vec<(Option<u64>, String)> = Vec::new();
    for record in reader.records() {
        let record = record?;
        let name = normalize_name(record.get(name_idx).unwrap_or(""));
        if name.is_empty() {
            return Err(PipelineError::Schema(format!(
                "{}: empty feature name at row {}",
                path.display(),
                rows.len() + 1
            )));
        }
        let ordinal = ordinal_idx
            .and_then(|i| record.get(i))
            .and_then(|v| v.trim().parse::<u64>().ok());
        rows.push((ordinal, name));
    }
    if ordinal_idx.is_some() && rows.iter().all(|(o, _)| o.is_some()) {
        rows.sort_by_key(|(o, _)| *o);
    }
    Ok(rows.into_iter().map(|(_, n)| n).collect())
}

/// Feature-definition names plus the implicit trailing label column.
pub fn canonical_columns(definitions: &[String], config: &SchemaConfig) -> Vec<String> {
    let mut names = definitions.to_vec();
    names.push(config.label_column.clone());
    names
}

/// Read every raw file (headerless) into one table of text cells.
///
/// A record carries either one field per feature definition, in which case
/// the trailing label cell starts empty and is derived later, or one extra
/// trailing field that fills it. Any other field count aborts with `Schema`.
pub fn load_raw(files: &[PathBuf], schema: &Schema) -> Result<FeatureTable> {
    let width = schema.len();
    let declared = width.saturating_sub(1);
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); width];
    let mut keys = Vec::new();

    for (source, path) in files.iter().enumerate() {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        let mut rows = 0u64;
        for (line, record) in reader.byte_records().enumerate() {
            let record = record?;
            if record.len() != declared && record.len() != width {
                return Err(PipelineError::Schema(format!(
                    "{}: record {} has {} columns, feature definitions declare {}",
                    path.display(),
                    line + 1,
                    record.len(),
                    declared
                )));
            }
            for (col, field) in cells.iter_mut().zip(record.iter()) {
                col.push(decode_field(field));
            }
            if record.len() == declared {
                if let Some(label) = cells.last_mut() {
                    label.push(String::new());
                }
            }
            keys.push(RowKey {
                source: source as u32,
                line: line as u64,
            });
            rows += 1;
        }
        info!(file = %path.display(), rows, "raw file loaded");
    }

    let columns = schema
        .columns()
        .iter()
        .cloned()
        .zip(cells)
        .map(|(spec, values)| Column::text(spec, values))
        .collect();
    FeatureTable::new(columns, keys).map_err(PipelineError::Schema)
}
