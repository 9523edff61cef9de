//! Atomic file output: write to a temporary file in the destination
//! directory, flush and sync, then rename over the target. A crash leaves
//! either the old file or nothing, never a partial one.

use crate::error::Result;
use crate::table::{ColumnData, FeatureTable};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Fully written and synced temp file waiting to be moved onto `path`.
/// Dropping it without `commit` removes the temp file.
#[derive(Debug)]
pub struct StagedFile {
    tmp: NamedTempFile,
    path: PathBuf,
}

impl StagedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn commit(self) -> Result<()> {
        self.tmp.persist(&self.path)?;
        Ok(())
    }
}

/// Run `write` against a temp file next to `path` without touching `path`.
pub fn stage<F>(path: &Path, write: F) -> Result<StagedFile>
where
    F: FnOnce(&mut BufWriter<&mut std::fs::File>) -> Result<()>,
{
    let dir = parent_dir(path);
    std::fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        write(&mut w)?;
        w.flush()?;
    }
    tmp.as_file().sync_all()?;
    Ok(StagedFile {
        tmp,
        path: path.to_path_buf(),
    })
}

/// Run `write` against a temp file next to `path`, then move it into place.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut std::fs::File>) -> Result<()>,
{
    stage(path, write)?.commit()
}

pub fn stage_bytes(path: &Path, bytes: &[u8]) -> Result<StagedFile> {
    stage(path, |w| {
        w.write_all(bytes)?;
        Ok(())
    })
}

pub fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    stage_bytes(path, bytes)?.commit()
}

/// Stage the table as CSV with a header row. Missing numeric cells are empty.
pub fn stage_table(table: &FeatureTable, path: &Path) -> Result<StagedFile> {
    stage(path, |w| {
        let mut csv = csv::Writer::from_writer(w);
        csv.write_record(table.names())?;
        let mut record: Vec<String> = Vec::with_capacity(table.n_cols());
        for row in 0..table.n_rows() {
            record.clear();
            for column in table.columns() {
                record.push(match &column.data {
                    ColumnData::Numeric(v) => v[row].map(|x| x.to_string()).unwrap_or_default(),
                    ColumnData::Text(v) => v[row].clone(),
                });
            }
            csv.write_record(&record)?;
        }
        csv.flush()?;
        Ok(())
    })
}

pub fn write_table(table: &FeatureTable, path: &Path) -> Result<usize> {
    stage_table(table, path)?.commit()?;
    info!(path = %path.display(), rows = table.n_rows(), columns = table.n_cols(), "table written");
    Ok(table.n_rows())
}
