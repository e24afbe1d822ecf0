//! Per-iteration training log.

use std::collections::VecDeque;
use std::time::Instant;

/// Statistics of one TRPO iteration.
#[derive(Debug, Clone, Default)]
pub struct IterationSnapshot {
    /// Iteration number (1-based).
    pub iteration: usize,
    /// Total environment steps.
    pub timesteps: usize,
    /// Total completed episodes.
    pub episodes: usize,
    /// Episodes completed in this iteration.
    pub episodes_this_iter: usize,
    /// Mean return over the recent-episode window.
    pub mean_return: f32,
    /// Mean length over the recent-episode window.
    pub mean_length: f32,
    /// Mean KL of the accepted step (0 if rejected).
    pub mean_kl: f32,
    /// Surrogate improvement of the accepted step.
    pub surrogate_improvement: f32,
    /// Policy entropy after the step.
    pub entropy: f32,
    /// Value function MSE of the last epoch.
    pub value_loss: f32,
}

impl IterationSnapshot {
    /// Create a snapshot with progress counters.
    pub fn new(iteration: usize, timesteps: usize, episodes: usize) -> Self {
        Self {
            iteration,
            timesteps,
            episodes,
            ..Self::default()
        }
    }

    /// Set episode statistics.
    pub fn with_episodes(mut self, this_iter: usize, window: &EpisodeWindow) -> Self {
        self.episodes_this_iter = this_iter;
        self.mean_return = window.mean_return();
        self.mean_length = window.mean_length();
        self
    }

    /// Set policy step statistics.
    pub fn with_policy_step(mut self, mean_kl: f32, improvement: f32, entropy: f32) -> Self {
        self.mean_kl = mean_kl;
        self.surrogate_improvement = improvement;
        self.entropy = entropy;
        self
    }

    /// Set the value loss.
    pub fn with_value_loss(mut self, value_loss: f32) -> Self {
        self.value_loss = value_loss;
        self
    }
}

/// Logger backend for iteration snapshots.
pub trait MetricsLogger: Send {
    /// Log one iteration.
    fn log(&mut self, snapshot: &IterationSnapshot);
}

/// Table-formatted logger on the `log` facade at info level.
pub struct ConsoleLogger {
    start_time: Instant,
    show_header: bool,
}

impl ConsoleLogger {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            show_header: true,
        }
    }
}

impl Default for ConsoleLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsLogger for ConsoleLogger {
    fn log(&mut self, snapshot: &IterationSnapshot) {
        if self.show_header {
            log::info!(
                "{:>5} {:>9} {:>8} {:>10} {:>8} {:>9} {:>10} {:>9} {:>9} {:>8}",
                "Iter", "Steps", "Episodes", "EpRewMean", "EpLen", "MeanKL", "SurrGain", "Entropy", "VfLoss", "SPS"
            );
            self.show_header = false;
        }

        let elapsed = self.start_time.elapsed().as_secs_f32();
        let sps = if elapsed > 0.0 {
            snapshot.timesteps as f32 / elapsed
        } else {
            0.0
        };

        log::info!(
            "{:>5} {:>9} {:>8} {:>10.4} {:>8.1} {:>9.5} {:>10.5} {:>9.4} {:>9.5} {:>8.1}",
            snapshot.iteration,
            snapshot.timesteps,
            snapshot.episodes,
            snapshot.mean_return,
            snapshot.mean_length,
            snapshot.mean_kl,
            snapshot.surrogate_improvement,
            snapshot.entropy,
            snapshot.value_loss,
            sps
        );
    }
}

/// Rolling window over the most recent episodes.
#[derive(Debug, Clone)]
pub struct EpisodeWindow {
    returns: VecDeque<f32>,
    lengths: VecDeque<u64>,
    capacity: usize,
}

impl EpisodeWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            returns: VecDeque::with_capacity(capacity),
            lengths: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Push completed episodes, evicting the oldest beyond capacity.
    pub fn extend(&mut self, returns: &[f32], lengths: &[u64]) {
        for (&r, &l) in returns.iter().zip(lengths) {
            if self.returns.len() == self.capacity {
                self.returns.pop_front();
                self.lengths.pop_front();
            }
            self.returns.push_back(r);
            self.lengths.push_back(l);
        }
    }

    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    /// Mean return, NaN while empty.
    pub fn mean_return(&self) -> f32 {
        if self.returns.is_empty() {
            return f32::NAN;
        }
        self.returns.iter().sum::<f32>() / self.returns.len() as f32
    }

    /// Mean length, NaN while empty.
    pub fn mean_length(&self) -> f32 {
        if self.lengths.is_empty() {
            return f32::NAN;
        }
        self.lengths.iter().sum::<u64>() as f32 / self.lengths.len() as f32
    }
}
