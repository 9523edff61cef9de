//! Bundle persistence: pretty JSON written atomically, plus a `.sha256`
//! sidecar holding the hex digest of the exact bytes on disk.

use crate::error::{PipelineError, Result};
use crate::model::RandomForest;
use crate::persist::{stage_bytes, StagedFile};
use crate::stages::{CategoryEncoder, MinMaxScaler};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

pub const BUNDLE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactBundle {
    pub format_version: u32,
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Model input order; scoring builds vectors in exactly this order
    pub feature_order: Vec<String>,
    /// Categorical feature encoders (string → code)
    pub encoders: BTreeMap<String, CategoryEncoder>,
    /// Attack category ↔ `attack_cat_label` code
    pub attack_encoder: CategoryEncoder,
    pub scaler: MinMaxScaler,
    /// P(attack) at or above this is a positive prediction
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifier: Option<RandomForest>,
}

pub fn checksum_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

fn digest_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}

/// Bundle and sidecar written to temp files, not yet in place.
#[derive(Debug)]
pub struct StagedBundle {
    bundle: StagedFile,
    sidecar: StagedFile,
    digest: String,
}

impl StagedBundle {
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn commit(self) -> Result<String> {
        let path = self.bundle.path().to_path_buf();
        self.bundle.commit()?;
        self.sidecar.commit()?;
        info!(path = %path.display(), sha256 = %self.digest, "artifact bundle written");
        Ok(self.digest)
    }
}

impl ArtifactBundle {
    pub fn new(
        run_id: Uuid,
        feature_order: Vec<String>,
        encoders: BTreeMap<String, CategoryEncoder>,
        attack_encoder: CategoryEncoder,
        scaler: MinMaxScaler,
        threshold: f64,
        classifier: Option<RandomForest>,
    ) -> Self {
        Self {
            format_version: BUNDLE_FORMAT_VERSION,
            run_id,
            created_at: Utc::now(),
            feature_order,
            encoders,
            attack_encoder,
            scaler,
            threshold,
            classifier,
        }
    }

    /// Serialize and stage bundle plus checksum sidecar without replacing
    /// anything on disk.
    pub fn stage(&self, path: &Path) -> Result<StagedBundle> {
        let bytes = serde_json::to_vec_pretty(self)?;
        let digest = digest_hex(&bytes);
        let bundle = stage_bytes(path, &bytes)?;
        let sidecar = stage_bytes(&checksum_path(path), format!("{}\n", digest).as_bytes())?;
        Ok(StagedBundle {
            bundle,
            sidecar,
            digest,
        })
    }

    /// Write bundle then checksum sidecar; returns the hex digest.
    pub fn save(&self, path: &Path) -> Result<String> {
        self.stage(path)?.commit()
    }

    /// Read and verify: checksum must match and the format version must be known.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let expected = std::fs::read_to_string(checksum_path(path))?;
        let actual = digest_hex(&bytes);
        if expected.trim() != actual {
            return Err(PipelineError::Config(format!(
                "{}: checksum mismatch (expected {}, got {})",
                path.display(),
                expected.trim(),
                actual
            )));
        }
        let bundle: ArtifactBundle = serde_json::from_slice(&bytes)?;
        if bundle.format_version != BUNDLE_FORMAT_VERSION {
            return Err(PipelineError::Config(format!(
                "unsupported bundle format version {}",
                bundle.format_version
            )));
        }
        Ok(bundle)
    }
}
