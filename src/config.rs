//! Pipeline configuration. Every section defaults to the constants of the
//! UNSW-NB15 preparation run, so an empty `{}` config is a complete one.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw capture files and the feature-definition file
    pub inputs: InputConfig,
    /// Cleaned table, artifact bundle and report destinations
    pub output: OutputConfig,
    /// Column roles declared once at ingestion
    pub schema: SchemaConfig,
    /// Percentile clipping and IQR diagnostics
    pub outliers: OutlierConfig,
    pub correlation: CorrelationConfig,
    /// Oversampling / undersampling targets
    pub rebalance: RebalanceConfig,
    /// Tree ensemble used for importances and the final classifier
    pub forest: ForestConfig,
    pub selection: SelectionConfig,
    pub training: TrainingConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Explicit raw capture files (headerless)
    pub raw_files: Vec<PathBuf>,
    /// Directory scanned for additional raw files
    pub raw_dir: Option<PathBuf>,
    /// File-name prefix a discovered raw file must carry
    pub raw_prefix: String,
    /// File extension a discovered raw file must carry
    pub raw_extension: String,
    /// Ordinal position → canonical column name (header present)
    pub feature_definitions: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub table_path: PathBuf,
    pub bundle_path: PathBuf,
    pub report_path: Option<PathBuf>,
    /// Keep the integer attack category next to `label` in the output table
    pub include_attack_cat_label: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Forced to string type even when values look numeric
    pub categorical: Vec<String>,
    /// Raw identifiers and known leaks, dropped before any encoding
    pub identifiers: Vec<String>,
    pub label_column: String,
    pub attack_column: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Heavy-tailed columns clipped to their own percentile bounds
    pub clip_columns: Vec<String>,
    pub lower_quantile: f64,
    pub upper_quantile: f64,
    /// Fence width for the diagnostic IQR bounds
    pub iqr_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Absolute Pearson correlation above which the later column is dropped
    pub threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    /// Minority count target as a fraction of the majority count
    pub oversample_ratio: f64,
    /// Final minority:majority ratio after undersampling
    pub undersample_ratio: f64,
    /// Neighbours considered for synthetic interpolation
    pub k_neighbors: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Features tried per split; `None` means sqrt(feature count)
    pub max_features: Option<usize>,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Features whose importance is below this are removed
    pub importance_threshold: f64,
    /// Removed regardless of measured importance
    pub denylist: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fit the final classifier and ship it in the artifact bundle
    pub train_classifier: bool,
    /// Probability cutoff for a positive prediction (0.0–1.0)
    pub decision_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            raw_files: Vec::new(),
            raw_dir: None,
            raw_prefix: "UNSW-NB15_".to_string(),
            raw_extension: "csv".to_string(),
            feature_definitions: PathBuf::from("NUSW-NB15_features.csv"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            table_path: PathBuf::from("UNSW_NB15_Cleaned.csv"),
            bundle_path: PathBuf::from("ids_bundle.json"),
            report_path: None,
            include_attack_cat_label: true,
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            categorical: strings(&["proto", "state", "service", "attack_cat"]),
            identifiers: strings(&[
                "srcip",
                "dstip",
                "ct_ftp_cmd",
                "is_ftp_login",
                "ct_flw_http_mthd",
                "Label",
            ]),
            label_column: "label".to_string(),
            attack_column: "attack_cat".to_string(),
        }
    }
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            clip_columns: strings(&[
                "dsport", "dur", "sbytes", "dbytes", "sttl", "dttl", "sloss", "dloss", "Sload",
                "Dload", "Spkts", "Dpkts", "smeansz", "dmeansz", "trans_depth", "res_bdy_len",
                "Sjit", "Djit", "Sintpkt", "Dintpkt", "tcprtt", "synack", "ackdat",
                "is_sm_ips_ports", "ct_state_ttl", "ct_srv_src", "ct_srv_dst", "ct_dst_ltm",
                "ct_src_ltm", "ct_src_dport_ltm", "ct_dst_sport_ltm", "ct_dst_src_ltm",
            ]),
            lower_quantile: 0.01,
            upper_quantile: 0.99,
            iqr_multiplier: 1.5,
        }
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self { threshold: 0.9 }
    }
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            oversample_ratio: 0.5,
            undersample_ratio: 0.8,
            k_neighbors: 5,
            seed: 42,
        }
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: None,
            seed: 42,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            importance_threshold: 0.001,
            denylist: strings(&[
                "is_ftp_login",
                "srcip",
                "ct_ftp_cmd",
                "ct_src_ltm",
                "ackdat",
                "attack_cat",
                "dwin",
                "Ltime",
                "dstip",
                "synack",
                "tcprtt",
                "Label",
                "Spkts",
                "dloss",
                "ct_flw_http_mthd",
                "Dpkts",
            ]),
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            train_classifier: true,
            decision_threshold: 0.5,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl PipelineConfig {
    /// Load from JSON file if present; otherwise return default.
    /// A file that exists but does not parse is an error, not a silent default.
    pub fn load(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&data)
            .map_err(|e| PipelineError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject parameter combinations no stage can honour.
    pub fn validate(&self) -> Result<()> {
        let q = &self.outliers;
        if !(0.0..=1.0).contains(&q.lower_quantile)
            || !(0.0..=1.0).contains(&q.upper_quantile)
            || q.lower_quantile > q.upper_quantile
        {
            return Err(PipelineError::Config(format!(
                "clip quantiles must satisfy 0 <= lower <= upper <= 1 (got {} / {})",
                q.lower_quantile, q.upper_quantile
            )));
        }
        let r = &self.rebalance;
        if r.oversample_ratio <= 0.0 || r.oversample_ratio > 1.0 {
            return Err(PipelineError::Config("oversample_ratio must be in (0, 1]".into()));
        }
        if r.undersample_ratio <= 0.0 || r.undersample_ratio > 1.0 {
            return Err(PipelineError::Config("undersample_ratio must be in (0, 1]".into()));
        }
        if self.forest.n_trees == 0 {
            return Err(PipelineError::Config("forest.n_trees must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.training.decision_threshold) {
            return Err(PipelineError::Config("decision_threshold must be in [0, 1]".into()));
        }
        Ok(())
    }
}
