//! Environment abstraction for single-agent training.
//!
//! The learner drives exactly one environment instance at a time. Hardware
//! backed environments cannot be vectorized, so unlike batched simulators the
//! contract is a plain reset/step loop over flat `f32` vectors.

use std::error::Error;

/// Result from stepping an environment once.
#[derive(Debug, Clone)]
pub struct Step {
    /// Observation after the step [obs_size]
    pub observation: Vec<f32>,
    /// Reward received for the transition
    pub reward: f32,
    /// Episode ended due to goal/failure
    pub terminal: bool,
    /// Episode ended due to a time or step limit
    pub truncated: bool,
}

impl Step {
    /// Create a new step result.
    pub fn new(observation: Vec<f32>, reward: f32, terminal: bool, truncated: bool) -> Self {
        Self {
            observation,
            reward,
            terminal,
            truncated,
        }
    }

    /// Episode is over (terminal OR truncated).
    pub fn done(&self) -> bool {
        self.terminal || self.truncated
    }
}

/// A continuous-control environment with box-bounded actions.
pub trait Environment {
    /// Error produced by the environment or its device.
    type Error: Error + Send + Sync + 'static;

    /// Size of one observation vector.
    fn observation_size(&self) -> usize;

    /// Number of action dimensions.
    fn action_dim(&self) -> usize;

    /// Per-dimension action bounds `(low, high)`.
    fn action_bounds(&self) -> (Vec<f32>, Vec<f32>);

    /// Start a new episode and return its first observation.
    fn reset(&mut self) -> Result<Vec<f32>, Self::Error>;

    /// Apply one action and advance the environment by one control period.
    fn step(&mut self, action: &[f32]) -> Result<Step, Self::Error>;
}
