//! Fixed-horizon trajectory segments.
//!
//! A segment is exactly `horizon` environment steps. Episodes run across
//! segment boundaries: the collector carries the current observation and the
//! partial episode return into the next segment, and only episodes that end
//! inside a segment are reported with it.

use burn::tensor::backend::Backend;

use super::gaussian_policy::{to_vec, PolicyActor};
use super::value_function::ValueMlp;
use crate::environment::Environment;
use crate::error::{TrpoError, TrpoResult};

/// One batch of on-policy experience.
#[derive(Debug, Clone, Default)]
pub struct Segment {
    /// Raw observations [T * obs_size]
    pub observations: Vec<f32>,
    /// Sampled actions [T * action_dim]
    pub actions: Vec<f32>,
    /// Rewards [T]
    pub rewards: Vec<f32>,
    /// Episode ended after step t [T]
    pub dones: Vec<bool>,
    /// Value predictions V(s_t) [T]
    pub values: Vec<f32>,
    /// Bootstrap value after the last step (0 if it ended an episode)
    pub last_value: f32,
    /// Returns of episodes completed in this segment
    pub episode_returns: Vec<f32>,
    /// Lengths of episodes completed in this segment
    pub episode_lengths: Vec<u64>,
}

impl Segment {
    /// Number of steps.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

/// Collects segments while carrying episode state between them.
#[derive(Debug, Default)]
pub struct SegmentCollector {
    observation: Option<Vec<f32>>,
    episode_return: f32,
    episode_length: u64,
}

impl SegmentCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `horizon` steps with `actor` and record value predictions from `value`.
    pub fn collect<E, B>(
        &mut self,
        env: &mut E,
        actor: &PolicyActor<B>,
        value: &ValueMlp<B>,
        horizon: usize,
    ) -> TrpoResult<Segment>
    where
        E: Environment,
        B: Backend,
    {
        let obs_size = env.observation_size();
        let action_dim = env.action_dim();

        let mut segment = Segment {
            observations: Vec::with_capacity(horizon * obs_size),
            actions: Vec::with_capacity(horizon * action_dim),
            rewards: Vec::with_capacity(horizon),
            dones: Vec::with_capacity(horizon),
            values: Vec::with_capacity(horizon),
            ..Segment::default()
        };

        let mut observation = match self.observation.take() {
            Some(obs) => obs,
            None => env.reset().map_err(TrpoError::environment)?,
        };

        for _ in 0..horizon {
            check_len(obs_size, observation.len())?;

            let action = actor.act(&observation, true)?;
            let v = to_vec(value.forward(actor.normalized(&observation)))?[0];

            let step = env.step(&action).map_err(TrpoError::environment)?;
            let done = step.done();

            segment.observations.extend_from_slice(&observation);
            segment.actions.extend_from_slice(&action);
            segment.rewards.push(step.reward);
            segment.dones.push(done);
            segment.values.push(v);

            self.episode_return += step.reward;
            self.episode_length += 1;

            observation = if done {
                segment.episode_returns.push(self.episode_return);
                segment.episode_lengths.push(self.episode_length);
                self.episode_return = 0.0;
                self.episode_length = 0;
                env.reset().map_err(TrpoError::environment)?
            } else {
                step.observation
            };
        }

        segment.last_value = if segment.dones.last().copied().unwrap_or(false) {
            0.0
        } else {
            to_vec(value.forward(actor.normalized(&observation)))?[0]
        };
        self.observation = Some(observation);

        Ok(segment)
    }
}

fn check_len(expected: usize, actual: usize) -> TrpoResult<()> {
    if expected != actual {
        return Err(TrpoError::DimensionMismatch { expected, actual });
    }
    Ok(())
}
