//! Tree-ensemble classifier: importance ranking for feature selection and
//! the probability model shipped in the artifact bundle.

mod forest;

pub use forest::{DecisionTree, RandomForest};

use serde::{Deserialize, Serialize};

/// Anything that maps a feature vector (final feature order) to P(attack).
pub trait ProbabilityModel {
    fn n_features(&self) -> usize;
    /// Probability of the positive class, in [0, 1]
    fn predict_proba(&self, features: &[f64]) -> f64;
}

/// Feature name → importance, sorted descending. Scores are non-negative
/// and sum to 1. Used as a pruning signal only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportanceRanking {
    entries: Vec<(String, f64)>,
}

impl FeatureImportanceRanking {
    pub fn new(mut entries: Vec<(String, f64)>) -> Self {
        entries.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, s)| *s)
    }

    /// Features scoring strictly below `threshold`.
    pub fn below(&self, threshold: f64) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, s)| *s < threshold)
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn top(&self, n: usize) -> &[(String, f64)] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, s)| s).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranking_sorted_descending_with_name_tiebreak() {
        let r = FeatureImportanceRanking::new(vec![
            ("dur".into(), 0.25),
            ("sbytes".into(), 0.5),
            ("ackdat".into(), 0.25),
            ("sttl".into(), 0.0),
        ]);
        let names: Vec<&str> = r.entries().iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["sbytes", "ackdat", "dur", "sttl"]);
        assert_eq!(r.below(0.001), vec!["sttl".to_string()]);
        assert_eq!(r.top(2).len(), 2);
        assert_eq!(r.top(10).len(), 4);
        assert!((r.total() - 1.0).abs() < 1e-12);
    }
}
