//! Running observation statistics for input normalization.
//!
//! Batches are folded in with the parallel variant of Welford's algorithm, so
//! one update per training batch costs a single pass over the batch.
//!
//! # Example
//! ```ignore
//! use trust_region_rl::core::RunningMeanStd;
//!
//! let mut stats = RunningMeanStd::new(4);
//! stats.update_batch(&[1.0, 2.0, 3.0, 4.0, 2.0, 3.0, 4.0, 5.0]);
//! let normalized = stats.normalize_and_clip(&[1.5, 2.5, 3.5, 4.5], 5.0);
//! ```

use serde::{Deserialize, Serialize};

/// Per-dimension running mean and variance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningMeanStd {
    mean: Vec<f64>,
    /// Sum of squared deviations; variance = m2 / count
    m2: Vec<f64>,
    count: f64,
    /// Lower bound on the variance used for normalization
    min_variance: f64,
}

impl RunningMeanStd {
    /// Create empty statistics for `dim`-dimensional data.
    pub fn new(dim: usize) -> Self {
        Self {
            mean: vec![0.0; dim],
            m2: vec![0.0; dim],
            count: 0.0,
            min_variance: 1e-2,
        }
    }

    /// Override the variance floor.
    pub fn with_min_variance(mut self, min_variance: f64) -> Self {
        self.min_variance = min_variance;
        self
    }

    /// Fold a flattened batch `[obs0, obs1, ...]` into the statistics.
    ///
    /// # Panics
    /// Panics if the batch length is not a multiple of the dimension.
    pub fn update_batch(&mut self, batch: &[f32]) {
        let dim = self.mean.len();
        assert_eq!(batch.len() % dim, 0, "Batch size must be multiple of dimension");
        let n = (batch.len() / dim) as f64;
        if n == 0.0 {
            return;
        }

        let mut batch_mean = vec![0.0f64; dim];
        for obs in batch.chunks_exact(dim) {
            for (m, &x) in batch_mean.iter_mut().zip(obs) {
                *m += x as f64;
            }
        }
        batch_mean.iter_mut().for_each(|m| *m /= n);

        let mut batch_m2 = vec![0.0f64; dim];
        for obs in batch.chunks_exact(dim) {
            for i in 0..dim {
                let d = obs[i] as f64 - batch_mean[i];
                batch_m2[i] += d * d;
            }
        }

        let total = self.count + n;
        for i in 0..dim {
            let delta = batch_mean[i] - self.mean[i];
            self.mean[i] += delta * n / total;
            // M2_ab = M2_a + M2_b + delta^2 * n_a * n_b / (n_a + n_b)
            self.m2[i] += batch_m2[i] + delta * delta * self.count * n / total;
        }
        self.count = total;
    }

    /// Normalize one observation and clip every component to `[-clip, clip]`.
    pub fn normalize_and_clip(&self, obs: &[f32], clip: f32) -> Vec<f32> {
        assert_eq!(obs.len(), self.mean.len(), "Observation dimension mismatch");
        obs.iter()
            .enumerate()
            .map(|(i, &x)| {
                let z = ((x as f64 - self.mean[i]) / self.std(i)) as f32;
                z.clamp(-clip, clip)
            })
            .collect()
    }

    /// Normalize a flattened batch in place, clipping to `[-clip, clip]`.
    pub fn normalize_batch_inplace(&self, batch: &mut [f32], clip: f32) {
        let dim = self.mean.len();
        for obs in batch.chunks_exact_mut(dim) {
            for (i, x) in obs.iter_mut().enumerate() {
                let z = ((*x as f64 - self.mean[i]) / self.std(i)) as f32;
                *x = z.clamp(-clip, clip);
            }
        }
    }

    #[inline]
    fn std(&self, i: usize) -> f64 {
        if self.count < 2.0 {
            1.0
        } else {
            (self.m2[i] / self.count).max(self.min_variance).sqrt()
        }
    }

    /// Running mean per dimension.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Population variance per dimension (1.0 before two samples were seen).
    pub fn variance(&self) -> Vec<f64> {
        if self.count < 2.0 {
            vec![1.0; self.mean.len()]
        } else {
            self.m2.iter().map(|&v| v / self.count).collect()
        }
    }

    /// Number of samples folded in.
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Dimensionality.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_mean_and_variance() {
        let mut stats = RunningMeanStd::new(1);
        // Mean 5, variance 4
        stats.update_batch(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((stats.mean()[0] - 5.0).abs() < 1e-10);
        assert!((stats.variance()[0] - 4.0).abs() < 1e-10);
    }

    #[test]
    fn test_split_batches_match_single_batch() {
        let data = [1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0, 5.0, 50.0];

        let mut whole = RunningMeanStd::new(2);
        whole.update_batch(&data);

        let mut split = RunningMeanStd::new(2);
        split.update_batch(&data[..4]);
        split.update_batch(&data[4..]);

        for i in 0..2 {
            assert!((whole.mean()[i] - split.mean()[i]).abs() < 1e-9);
            assert!((whole.variance()[i] - split.variance()[i]).abs() < 1e-9);
        }
        assert_eq!(split.count(), 5.0);
    }

    #[test]
    fn test_normalize_before_data_is_identity() {
        let stats = RunningMeanStd::new(3);
        assert_eq!(stats.normalize_and_clip(&[0.5, -1.0, 2.0], 5.0), vec![0.5, -1.0, 2.0]);
    }

    #[test]
    fn test_normalize_clips() {
        let mut stats = RunningMeanStd::new(1);
        stats.update_batch(&[0.0, 1.0, 0.0, 1.0]);
        let z = stats.normalize_and_clip(&[1000.0], 5.0);
        assert_eq!(z, vec![5.0]);
        let z = stats.normalize_and_clip(&[-1000.0], 5.0);
        assert_eq!(z, vec![-5.0]);
    }

    #[test]
    fn test_variance_floor_applies() {
        let mut stats = RunningMeanStd::new(1);
        stats.update_batch(&[3.0, 3.0, 3.0]);
        // Zero variance floored at 1e-2 -> std 0.1
        let z = stats.normalize_and_clip(&[3.1], 5.0);
        assert!((z[0] - 1.0).abs() < 1e-4, "got {}", z[0]);
    }

    #[test]
    fn test_custom_variance_floor() {
        let mut stats = RunningMeanStd::new(1).with_min_variance(0.25);
        stats.update_batch(&[2.0, 2.0, 2.0]);
        // Floor 0.25 -> std 0.5
        let z = stats.normalize_and_clip(&[3.0], 5.0);
        assert!((z[0] - 2.0).abs() < 1e-5, "got {}", z[0]);
    }

    #[test]
    fn test_batch_inplace_matches_single() {
        let mut stats = RunningMeanStd::new(2);
        stats.update_batch(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);

        let mut batch = vec![1.0, 2.0, 3.0, 4.0];
        stats.normalize_batch_inplace(&mut batch, 5.0);
        assert_eq!(&batch[..2], stats.normalize_and_clip(&[1.0, 2.0], 5.0).as_slice());
        assert_eq!(&batch[2..], stats.normalize_and_clip(&[3.0, 4.0], 5.0).as_slice());
    }
}
