//! Synthetic minority oversampling: new points interpolate between a
//! minority sample and one of its nearest minority neighbours.

use super::minority_of;
use crate::error::Result;
use ndarray::{concatenate, Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::cmp::Ordering;
use tracing::debug;

pub struct Smote {
    /// Target minority count as a fraction of the majority count
    ratio: f64,
    k_neighbors: usize,
    seed: u64,
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Indices (into `points`) of the `k` nearest other rows of each row.
/// Ties are broken by index so the result is deterministic.
fn nearest_neighbors(points: &Array2<f64>, k: usize) -> Vec<Vec<usize>> {
    let n = points.nrows();
    (0..n)
        .map(|i| {
            let row = points.row(i);
            let mut dists: Vec<(f64, usize)> = (0..n)
                .filter(|&j| j != i)
                .map(|j| (squared_distance(row, points.row(j)), j))
                .collect();
            let by_dist = |a: &(f64, usize), b: &(f64, usize)| {
                a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal).then(a.1.cmp(&b.1))
            };
            if dists.len() > k {
                dists.select_nth_unstable_by(k, by_dist);
                dists.truncate(k);
            }
            dists.sort_by(by_dist);
            dists.into_iter().map(|(_, j)| j).collect()
        })
        .collect()
}

impl Smote {
    pub fn new(ratio: f64, k_neighbors: usize, seed: u64) -> Self {
        Self {
            ratio,
            k_neighbors,
            seed,
        }
    }

    /// Number of synthetic rows needed to lift `minority` to
    /// `ratio × majority` (truncated); zero when already there.
    pub fn synthetic_count(&self, minority: usize, majority: usize) -> usize {
        let target = (majority as f64 * self.ratio).floor() as usize;
        target.saturating_sub(minority)
    }

    /// Returns the input rows followed by the synthetic minority rows.
    pub fn fit_resample(&self, x: &Array2<f64>, y: &Array1<u8>) -> Result<(Array2<f64>, Array1<u8>)> {
        let (minority_label, minority, majority) = minority_of(y)?;
        let n_new = self.synthetic_count(minority, majority);
        if n_new == 0 {
            debug!(minority, majority, "minority already at target; no synthetic rows");
            return Ok((x.clone(), y.clone()));
        }

        let rows: Vec<usize> = y
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == minority_label)
            .map(|(i, _)| i)
            .collect();
        let points = x.select(Axis(0), &rows);
        let k = self.k_neighbors.min(points.nrows().saturating_sub(1));
        let neighbors = nearest_neighbors(&points, k);

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut synthetic = Array2::<f64>::zeros((n_new, x.ncols()));
        for mut out in synthetic.rows_mut() {
            let i = rng.gen_range(0..points.nrows());
            let base = points.row(i);
            if neighbors[i].is_empty() {
                out.assign(&base);
                continue;
            }
            let j = neighbors[i][rng.gen_range(0..neighbors[i].len())];
            let gap: f64 = rng.gen();
            let other = points.row(j);
            out.assign(&(&base + &((&other - &base) * gap)));
        }

        let x_out = concatenate(Axis(0), &[x.view(), synthetic.view()])
            .map_err(|e| crate::error::PipelineError::Schema(e.to_string()))?;
        let mut y_out = y.to_vec();
        y_out.extend(std::iter::repeat(minority_label).take(n_new));
        debug!(minority, majority, synthetic = n_new, k, "synthetic minority rows generated");
        Ok((x_out, Array1::from(y_out)))
    }
}
