//! Scoring boundary. Loads the artifact bundle once; a load failure leaves
//! the scorer NotReady, and every request then reports `Unavailable`
//! instead of producing a prediction.

use crate::artifacts::ArtifactBundle;
use crate::error::ScoreError;
use crate::model::ProbabilityModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// One flow field as received: categorical fields arrive as text, numeric
/// ones as numbers (numeric text is accepted too).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

/// Raw flow record keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlowRecord(pub BTreeMap<String, FieldValue>);

impl FlowRecord {
    pub fn with(mut self, name: &str, value: FieldValue) -> Self {
        self.0.insert(name.to_string(), value);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub prediction: u8,
    pub probability: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub model_loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

enum ScorerState {
    Ready(Box<ArtifactBundle>),
    NotReady { reason: String },
}

pub struct Scorer {
    state: ScorerState,
}

impl Scorer {
    /// Never fails: any load or validation problem yields a NotReady scorer.
    pub fn load(path: &Path) -> Self {
        match ArtifactBundle::load(path) {
            Ok(bundle) => {
                let scorer = Self::from_bundle(bundle);
                if scorer.is_ready() {
                    info!(path = %path.display(), "scorer ready");
                }
                scorer
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "artifact bundle unavailable; scorer not ready");
                Self::not_ready(e.to_string())
            }
        }
    }

    pub fn from_bundle(bundle: ArtifactBundle) -> Self {
        match &bundle.classifier {
            None => Self::not_ready("bundle carries no classifier".to_string()),
            Some(c) if c.n_features() != bundle.feature_order.len() => Self::not_ready(format!(
                "classifier expects {} features, bundle orders {}",
                c.n_features(),
                bundle.feature_order.len()
            )),
            Some(_) => Self {
                state: ScorerState::Ready(Box::new(bundle)),
            },
        }
    }

    pub fn not_ready(reason: String) -> Self {
        warn!(%reason, "scorer not ready");
        Self {
            state: ScorerState::NotReady { reason },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, ScorerState::Ready(_))
    }

    pub fn health(&self) -> HealthReport {
        match &self.state {
            ScorerState::Ready(b) => HealthReport {
                status: "ok".into(),
                model_loaded: true,
                threshold: Some(b.threshold),
                features: Some(b.feature_order.clone()),
                error: None,
            },
            ScorerState::NotReady { reason } => HealthReport {
                status: "error".into(),
                model_loaded: false,
                threshold: None,
                features: None,
                error: Some(reason.clone()),
            },
        }
    }

    fn bundle(&self) -> Result<&ArtifactBundle, ScoreError> {
        match &self.state {
            ScorerState::Ready(b) => Ok(b),
            ScorerState::NotReady { reason } => Err(ScoreError::Unavailable {
                reason: reason.clone(),
            }),
        }
    }

    /// Encode and scale a record into the bundle's feature order. Unseen
    /// categories are rejected; out-of-range numbers scale past [0, 1].
    pub fn vectorize(&self, record: &FlowRecord) -> Result<Vec<f64>, ScoreError> {
        let bundle = self.bundle()?;
        bundle
            .feature_order
            .iter()
            .map(|name| {
                let value = record
                    .0
                    .get(name)
                    .ok_or_else(|| ScoreError::MissingFeature(name.clone()))?;
                if let Some(encoder) = bundle.encoders.get(name) {
                    let text = match value {
                        FieldValue::Text(s) => s.trim().to_string(),
                        FieldValue::Number(n) => n.to_string(),
                    };
                    return encoder
                        .encode(&text)
                        .map(|code| code as f64)
                        .ok_or(ScoreError::Encoding {
                            column: name.clone(),
                            value: text,
                        });
                }
                let raw = match value {
                    FieldValue::Number(n) => Some(*n),
                    FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
                }
                .filter(|v| v.is_finite())
                .ok_or_else(|| ScoreError::InvalidValue { column: name.clone() })?;
                Ok(bundle.scaler.transform_value(name, raw))
            })
            .collect()
    }

    pub fn score(&self, record: &FlowRecord) -> Result<Prediction, ScoreError> {
        let bundle = self.bundle()?;
        let features = self.vectorize(record)?;
        let classifier = bundle.classifier.as_ref().ok_or_else(|| ScoreError::Unavailable {
            reason: "bundle carries no classifier".into(),
        })?;
        let probability = classifier.predict_proba(&features);
        Ok(Prediction {
            prediction: u8::from(probability >= bundle.threshold),
            probability,
            threshold: bundle.threshold,
        })
    }
}
