//! Action-normalizing wrapper.
//!
//! Gaussian policies emit actions around zero with unit scale, while the
//! reacher expects raw torque units. [`NormalizedEnv`] presents a `[-1, 1]`
//! action box and maps it affinely onto the wrapped environment's bounds.
//! Observations and rewards pass through unchanged.

use trust_region_rl::{Environment, Step};

use crate::env::EnvLifecycle;
use crate::error::EnvResult;
use crate::live_state::LiveView;

/// Wrapper exposing `[-1, 1]` actions.
pub struct NormalizedEnv<E: Environment> {
    inner: E,
    low: Vec<f32>,
    high: Vec<f32>,
}

impl<E: Environment> NormalizedEnv<E> {
    pub fn new(inner: E) -> Self {
        let (low, high) = inner.action_bounds();
        Self { inner, low, high }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    /// Map a `[-1, 1]` action onto the inner bounds, clipping first.
    pub fn denormalize(&self, action: &[f32]) -> Vec<f32> {
        action
            .iter()
            .zip(self.low.iter().zip(&self.high))
            .map(|(&a, (&lb, &ub))| {
                let scaled = lb + (a.clamp(-1.0, 1.0) + 1.0) * 0.5 * (ub - lb);
                scaled.clamp(lb, ub)
            })
            .collect()
    }
}

impl<E: Environment> Environment for NormalizedEnv<E> {
    type Error = E::Error;

    fn observation_size(&self) -> usize {
        self.inner.observation_size()
    }

    fn action_dim(&self) -> usize {
        self.inner.action_dim()
    }

    fn action_bounds(&self) -> (Vec<f32>, Vec<f32>) {
        let n = self.inner.action_dim();
        (vec![-1.0; n], vec![1.0; n])
    }

    fn reset(&mut self) -> Result<Vec<f32>, Self::Error> {
        self.inner.reset()
    }

    fn step(&mut self, action: &[f32]) -> Result<Step, Self::Error> {
        if action.len() != self.low.len() {
            // Let the inner environment report the mismatch.
            return self.inner.step(action);
        }
        let scaled = self.denormalize(action);
        self.inner.step(&scaled)
    }
}

impl<E: Environment + EnvLifecycle> EnvLifecycle for NormalizedEnv<E> {
    fn start(&mut self) -> EnvResult<()> {
        self.inner.start()
    }

    fn close(&mut self) -> EnvResult<()> {
        self.inner.close()
    }

    fn live_view(&self) -> LiveView {
        self.inner.live_view()
    }
}
