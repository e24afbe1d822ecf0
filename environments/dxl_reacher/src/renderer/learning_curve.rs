//! Smoothed learning curve.
//!
//! Episodes are placed on a step axis by the cumulative sum of their lengths.
//! The curve is sampled every `stride` steps; each sample averages the returns
//! of the episodes that ended strictly inside the preceding `window` steps.
//! Samples with no such episode are left out, and the kept averages are drawn
//! at consecutive multiples of `stride`, so a gap moves later points left.

use trust_region_rl::TrainingRecord;

use super::config::PlotConfig;

/// One sample of the learning curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    /// Plotted step: `k * stride` for the k-th kept average (1-based).
    pub step: u64,
    /// Mean return of the episodes inside the window.
    pub average_return: f32,
}

/// Recorded episode lengths, or `batch_size * i` when none were recorded.
pub fn episode_lengths_or_fallback(lengths: &[u64], n_returns: usize, batch_size: u64) -> Vec<u64> {
    if lengths.is_empty() {
        (0..n_returns as u64).map(|i| batch_size * i).collect()
    } else {
        lengths.to_vec()
    }
}

/// Running sum of episode lengths.
pub fn cumulative_steps(lengths: &[u64]) -> Vec<u64> {
    lengths
        .iter()
        .scan(0u64, |total, &len| {
            *total += len;
            Some(*total)
        })
        .collect()
}

/// Sample points `stride, 2·stride, …` up to and including `last_cumulative`.
pub fn sample_axis(last_cumulative: u64, stride: u64) -> Vec<u64> {
    if stride == 0 {
        return Vec::new();
    }
    (1..=last_cumulative / stride).map(|k| k * stride).collect()
}

/// Windowed average of `returns` at every sample point.
///
/// `returns[i]` sits at step `cumulative[i]`. A sample at `s` averages every
/// return with `max(0, s - window) < cumulative[i] < s`. Empty windows are
/// dropped before the points are laid out at `stride, 2·stride, …`.
pub fn windowed_average_returns(
    returns: &[f32],
    cumulative: &[u64],
    stride: u64,
    window: u64,
) -> Vec<CurvePoint> {
    let Some(&last) = cumulative.last() else {
        return Vec::new();
    };

    sample_axis(last, stride)
        .into_iter()
        .filter_map(|s| {
            let low = s.saturating_sub(window);
            let (sum, count) = returns
                .iter()
                .zip(cumulative)
                .filter(|(_, &c)| c > low && c < s)
                .fold((0.0f64, 0usize), |(sum, n), (&r, _)| (sum + r as f64, n + 1));
            (count > 0).then(|| (sum / count as f64) as f32)
        })
        .zip(1u64..)
        .map(|(average_return, k)| CurvePoint {
            step: k * stride,
            average_return,
        })
        .collect()
}

/// Learning curve ready for plotting.
#[derive(Debug, Clone, PartialEq)]
pub struct LearningCurve {
    pub points: Vec<CurvePoint>,
    stride: u64,
}

impl LearningCurve {
    /// Compute the curve from a record snapshot.
    ///
    /// Returns `None` until at least one sample has a non-empty window.
    pub fn compute(record: &TrainingRecord, batch_size: u64, config: &PlotConfig) -> Option<Self> {
        let returns = &record.episodic_returns;
        let lengths = episode_lengths_or_fallback(&record.episodic_lengths, returns.len(), batch_size);
        let cumulative = cumulative_steps(&lengths);
        let points = windowed_average_returns(returns, &cumulative, config.sample_stride, config.window_steps);
        if points.is_empty() {
            return None;
        }
        Some(Self {
            points,
            stride: config.sample_stride,
        })
    }

    /// `[stride, points * stride]`, widened to one stride for a single point.
    pub fn x_range(&self) -> (f64, f64) {
        let first = self.stride as f64;
        let last = (self.points.len() as u64 * self.stride) as f64;
        if last > first {
            (first, last)
        } else {
            (first, first + self.stride as f64)
        }
    }

    /// Return range padded by `padding` times the span on each side.
    ///
    /// A flat curve is padded by `padding` times its magnitude (at least 1).
    pub fn y_range(&self, padding: f64) -> (f64, f64) {
        let (min, max) = self.points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            let v = p.average_return as f64;
            (lo.min(v), hi.max(v))
        });
        let span = (max - min).abs();
        let buffer = if span > 0.0 {
            span * padding
        } else {
            max.abs().max(1.0) * padding
        };
        (min - buffer, max + buffer)
    }

    /// `(step, average_return)` pairs.
    pub fn series(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points.iter().map(|p| (p.step as f64, p.average_return as f64))
    }
}
