//! Class rebalancing on (X, y) matrices: synthetic minority oversampling,
//! then random majority undersampling. The output is a training view only
//! and never replaces the cleaned table.

mod smote;
mod undersample;

pub use smote::Smote;
pub use undersample::RandomUndersampler;

use crate::config::RebalanceConfig;
use crate::error::{PipelineError, Result};
use crate::stages::ClassCounts;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Minority label and the (minority, majority) counts. Rejects a single-class
/// input.
pub(crate) fn minority_of(y: &Array1<u8>) -> Result<(u8, usize, usize)> {
    let counts = ClassCounts::from_labels(y.iter());
    if counts.positives == 0 {
        return Err(PipelineError::EmptyClass { label: 1 });
    }
    if counts.negatives == 0 {
        return Err(PipelineError::EmptyClass { label: 0 });
    }
    if counts.positives <= counts.negatives {
        Ok((1, counts.positives, counts.negatives))
    } else {
        Ok((0, counts.negatives, counts.positives))
    }
}

pub(crate) fn take_rows(x: &Array2<f64>, y: &Array1<u8>, rows: &[usize]) -> (Array2<f64>, Array1<u8>) {
    (x.select(Axis(0), rows), y.select(Axis(0), rows))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceSummary {
    pub original: ClassCounts,
    pub after_oversample: ClassCounts,
    pub after_undersample: ClassCounts,
}

pub struct Rebalancer {
    smote: Smote,
    undersampler: RandomUndersampler,
}

impl Rebalancer {
    pub fn new(config: &RebalanceConfig) -> Self {
        Self {
            smote: Smote::new(config.oversample_ratio, config.k_neighbors, config.seed),
            undersampler: RandomUndersampler::new(config.undersample_ratio, config.seed),
        }
    }

    /// Oversample first: the undersampler needs the raised minority count to
    /// leave a meaningful majority.
    pub fn fit_resample(
        &self,
        x: &Array2<f64>,
        y: &Array1<u8>,
    ) -> Result<(Array2<f64>, Array1<u8>, RebalanceSummary)> {
        let original = ClassCounts::from_labels(y.iter());
        let (xo, yo) = self.smote.fit_resample(x, y)?;
        let after_oversample = ClassCounts::from_labels(yo.iter());
        let (xu, yu) = self.undersampler.fit_resample(&xo, &yo)?;
        let after_undersample = ClassCounts::from_labels(yu.iter());
        info!(
            ?original,
            ?after_oversample,
            ?after_undersample,
            "rebalancing complete"
        );
        Ok((
            xu,
            yu,
            RebalanceSummary {
                original,
                after_oversample,
                after_undersample,
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn imbalanced(minority: usize, majority: usize) -> (Array2<f64>, Array1<u8>) {
        let n = minority + majority;
        let x = Array2::from_shape_fn((n, 3), |(i, j)| {
            let base = if i < minority { 10.0 } else { 0.0 };
            base + ((i * 7 + j * 3) % 11) as f64 * 0.1
        });
        let y = (0..n).map(|i| u8::from(i < minority)).collect();
        (x, y)
    }

    #[test]
    fn ratios_follow_targets() {
        let (x, y) = imbalanced(10, 100);
        let r = Rebalancer::new(&RebalanceConfig::default());
        let (xr, yr, summary) = r.fit_resample(&x, &y).unwrap();
        assert_eq!(summary.original, ClassCounts { negatives: 100, positives: 10 });

        let over = summary.after_oversample;
        assert_eq!(over.negatives, 100);
        assert!((over.positives as i64 - 50).abs() <= 1);

        let under = summary.after_undersample;
        assert_eq!(under.positives, over.positives);
        let ratio = under.positives as f64 / under.negatives as f64;
        let expected_majority = under.positives as f64 / 0.8;
        assert!((under.negatives as f64 - expected_majority).abs() <= 1.0, "ratio {}", ratio);
        assert_eq!(xr.nrows(), yr.len());
        assert_eq!(xr.ncols(), 3);
    }

    #[test]
    fn single_class_rejected() {
        let x = Array2::zeros((3, 2));
        let y = Array1::from(vec![0u8, 0, 0]);
        let err = Rebalancer::new(&RebalanceConfig::default()).fit_resample(&x, &y).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyClass { label: 1 }));
    }
}
