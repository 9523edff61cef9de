//! Random majority undersampling without replacement.

use super::{minority_of, take_rows};
use crate::error::Result;
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use tracing::debug;

pub struct RandomUndersampler {
    /// Target minority:majority ratio
    ratio: f64,
    seed: u64,
}

impl RandomUndersampler {
    pub fn new(ratio: f64, seed: u64) -> Self {
        Self { ratio, seed }
    }

    /// Majority rows to keep so that minority / majority ≈ ratio.
    pub fn majority_target(&self, minority: usize) -> usize {
        (minority as f64 / self.ratio).floor() as usize
    }

    /// Keeps every minority row and a uniform sample of majority rows; the
    /// surviving rows stay in input order.
    pub fn fit_resample(&self, x: &Array2<f64>, y: &Array1<u8>) -> Result<(Array2<f64>, Array1<u8>)> {
        let (minority_label, minority, majority) = minority_of(y)?;
        let target = self.majority_target(minority);
        if majority <= target {
            debug!(minority, majority, "majority already at target; nothing dropped");
            return Ok((x.clone(), y.clone()));
        }

        let majority_rows: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|(_, l)| **l != minority_label)
            .map(|(i, _)| i)
            .collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut keep = vec![false; y.len()];
        for (i, l) in y.iter().enumerate() {
            keep[i] = *l == minority_label;
        }
        for pick in index::sample(&mut rng, majority_rows.len(), target).into_iter() {
            keep[majority_rows[pick]] = true;
        }
        let rows: Vec<usize> = keep
            .iter()
            .enumerate()
            .filter(|(_, k)| **k)
            .map(|(i, _)| i)
            .collect();
        debug!(minority, majority, kept = target, "majority rows sampled");
        Ok(take_rows(x, y, &rows))
    }
}
