//! Error taxonomy. Fatal pipeline errors abort the run; stage-internal
//! degradations (bad casts, constant columns) are values, not errors.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("schema error: {0}")]
    Schema(String),

    #[error("missing data source {path}: {reason}")]
    MissingData { path: PathBuf, reason: String },

    #[error("empty class: no rows with label {label}")]
    EmptyClass { label: u8 },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("directory walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("persist error: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors surfaced by the scoring boundary. None of these are fatal to the
/// process; a degraded scorer keeps answering with `Unavailable`.
#[derive(Debug, Error, PartialEq)]
pub enum ScoreError {
    #[error("scorer unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("unseen category {value:?} for column {column}")]
    Encoding { column: String, value: String },

    #[error("missing feature: {0}")]
    MissingFeature(String),

    #[error("invalid value for column {column}")]
    InvalidValue { column: String },
}
