//! flowprep: UNSW-NB15 flow feature preparation for intrusion detection.
//!
//! Modular structure:
//! - [`ingest`]: Raw capture discovery, feature definitions, concatenation
//! - [`stages`]: Repair, dedup, labeling, outliers, encoding, scaling, correlation, selection
//! - [`rebalance`]: Synthetic minority oversampling + random undersampling
//! - [`model`]: Seeded random forest (importance ranking, final classifier)
//! - [`artifacts`]: Versioned bundle consumed by the scorer
//! - [`scoring`]: Ready / not-ready scoring boundary
//! - [`pipeline`]: Stage orchestration and run report
//! - [`logging`]: Structured JSON logging

pub mod config;
pub mod error;
pub mod stats;
pub mod schema;
pub mod table;
pub mod ingest;
pub mod stages;
pub mod rebalance;
pub mod model;
pub mod persist;
pub mod artifacts;
pub mod scoring;
pub mod report;
pub mod pipeline;
pub mod logging;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result, ScoreError};
pub use table::{FeatureTable, RowKey};
pub use artifacts::ArtifactBundle;
pub use scoring::{FlowRecord, Prediction, Scorer};
pub use pipeline::{Pipeline, PipelineOutput};
pub use report::PipelineReport;
pub use logging::StructuredLogger;
