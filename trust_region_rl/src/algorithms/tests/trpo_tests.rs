//! Tests for the policy step and the training loop.

use std::convert::Infallible;

use burn::tensor::backend::Backend;

use super::{InnerBackend, TestBackend};
use crate::algorithms::config::TrpoConfig;
use crate::algorithms::gae::{compute_gae, standardize};
use crate::algorithms::gaussian_policy::{GaussianMlpPolicy, MlpPolicyConfig, PolicyFactory};
use crate::algorithms::rollout::SegmentCollector;
use crate::algorithms::trpo::{learn, policy_step, BatchReport, PolicyBatch};
use crate::algorithms::value_function::ValueMlp;
use crate::environment::{Environment, Step};

/// One-dimensional point that should move onto a target.
///
/// Observation `[x, target]`, action is a velocity, reward `-|target - x|`.
/// Episodes are truncated after `horizon` steps.
struct PointEnv {
    x: f32,
    target: f32,
    t: usize,
    horizon: usize,
    episodes: usize,
}

impl PointEnv {
    fn new(horizon: usize) -> Self {
        Self {
            x: 0.0,
            target: 0.5,
            t: 0,
            horizon,
            episodes: 0,
        }
    }
}

impl Environment for PointEnv {
    type Error = Infallible;

    fn observation_size(&self) -> usize {
        2
    }

    fn action_dim(&self) -> usize {
        1
    }

    fn action_bounds(&self) -> (Vec<f32>, Vec<f32>) {
        (vec![-1.0], vec![1.0])
    }

    fn reset(&mut self) -> Result<Vec<f32>, Infallible> {
        self.episodes += 1;
        self.x = 0.0;
        self.target = if self.episodes % 2 == 0 { 0.5 } else { -0.5 };
        self.t = 0;
        Ok(vec![self.x, self.target])
    }

    fn step(&mut self, action: &[f32]) -> Result<Step, Infallible> {
        self.x = (self.x + 0.1 * action[0].clamp(-1.0, 1.0)).clamp(-1.0, 1.0);
        self.t += 1;
        let reward = -(self.target - self.x).abs();
        Ok(Step::new(vec![self.x, self.target], reward, false, self.t >= self.horizon))
    }
}

fn device() -> <TestBackend as Backend>::Device {
    Default::default()
}

fn small_config() -> TrpoConfig {
    TrpoConfig::new()
        .with_max_timesteps(200)
        .with_timesteps_per_batch(100)
        .with_vf_batch_size(32)
        .with_vf(2, 1e-3)
}

/// Collect one batch and freeze it for a policy step.
fn prepared_batch(
    policy: &mut GaussianMlpPolicy,
    config: &TrpoConfig,
) -> PolicyBatch<TestBackend> {
    let d = device();
    let mut env = PointEnv::new(20);
    let value = ValueMlp::<InnerBackend>::new(2, policy.layout().hidden_sizes(), &d);
    let actor = policy.actor::<InnerBackend>(&d);
    let segment = SegmentCollector::new()
        .collect(&mut env, &actor, &value, config.timesteps_per_batch)
        .unwrap();

    let (mut advantages, _) = compute_gae(
        &segment.rewards,
        &segment.values,
        &segment.dones,
        segment.last_value,
        config.gamma,
        config.lam,
    );
    standardize(&mut advantages);
    policy.update_obs_rms(&segment.observations);
    let normalized = policy.normalize_observations(&segment.observations);

    PolicyBatch::new(
        policy,
        &normalized,
        &segment.actions,
        &advantages,
        config.fvp_subsample,
        config.entcoeff,
        &d,
    )
}

fn fresh_policy() -> GaussianMlpPolicy {
    TestBackend::seed(3);
    MlpPolicyConfig::new()
        .with_hidden_size(16)
        .build::<TestBackend>("pi", 2, 1, &device())
        .unwrap()
}

// ============================================================================
// Segment Collection
// ============================================================================

#[test]
fn test_segment_has_exact_horizon_and_carries_episodes() {
    let d = device();
    let policy = fresh_policy();
    let actor = policy.actor::<InnerBackend>(&d);
    let value = ValueMlp::<InnerBackend>::new(2, policy.layout().hidden_sizes(), &d);
    let mut env = PointEnv::new(20);
    let mut collector = SegmentCollector::new();

    // 30 steps: one full episode plus 10 steps of the next
    let first = collector.collect(&mut env, &actor, &value, 30).unwrap();
    assert_eq!(first.len(), 30);
    assert_eq!(first.observations.len(), 60);
    assert_eq!(first.episode_lengths, vec![20]);
    assert!(first.dones[19]);
    assert!(!first.dones[29]);

    // The partial episode finishes 10 steps into the next segment
    let second = collector.collect(&mut env, &actor, &value, 10).unwrap();
    assert_eq!(second.episode_lengths, vec![20]);
    assert!(second.dones[9]);
    assert_eq!(second.last_value, 0.0);
}

// ============================================================================
// Policy Step
// ============================================================================

#[test]
fn test_accepted_step_respects_kl_bound() {
    let config = small_config().with_max_kl(0.01);
    let mut policy = fresh_policy();
    let batch = prepared_batch(&mut policy, &config);

    let stats = policy_step(&mut policy, &batch, &config).unwrap();
    let after = batch.losses(policy.flat_params()).unwrap();

    if stats.accepted {
        assert!(after.mean_kl <= 1.5 * config.max_kl + 1e-6, "kl {}", after.mean_kl);
        assert!(stats.improvement >= 0.0);
        assert!((stats.mean_kl - after.mean_kl).abs() < 1e-6);
    } else {
        assert_eq!(policy.flat_params(), batch.theta_old());
    }
}

#[test]
fn test_rejected_step_keeps_parameters() {
    let mut config = small_config();
    config.max_backtracks = 0;
    let mut policy = fresh_policy();
    let batch = prepared_batch(&mut policy, &config);

    let stats = policy_step(&mut policy, &batch, &config).unwrap();
    assert!(!stats.accepted);
    assert_eq!(stats.mean_kl, 0.0);
    assert_eq!(policy.flat_params(), batch.theta_old());
}

#[test]
fn test_zero_advantages_skip_update() {
    let d = device();
    let config = small_config();
    let mut policy = fresh_policy();
    let obs = vec![0.1f32; 10 * 2];
    let actions = vec![0.2f32; 10];
    let advantages = vec![0.0f32; 10];
    let batch = PolicyBatch::<TestBackend>::new(&policy, &obs, &actions, &advantages, 5, 0.0, &d);

    let stats = policy_step(&mut policy, &batch, &config).unwrap();
    assert!(!stats.accepted);
    assert_eq!(policy.flat_params(), batch.theta_old());
}

// ============================================================================
// Training Loop
// ============================================================================

#[test]
fn test_learn_reports_every_batch() {
    let mut env = PointEnv::new(20);
    let config = small_config();
    let policy_config = MlpPolicyConfig::new().with_hidden_size(16);
    let mut reports: Vec<BatchReport> = Vec::new();

    TestBackend::seed(11);
    let summary = learn::<TestBackend, _, _, _>(&mut env, &policy_config, &config, &device(), |report| {
        reports.push(report.clone());
    })
    .unwrap();

    assert_eq!(summary.iterations, 2);
    assert_eq!(summary.timesteps, 200);
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].iteration, 1);
    assert_eq!(reports[0].timesteps_so_far, 100);
    assert_eq!(reports[1].timesteps_so_far, 200);

    // 20-step episodes fit exactly five times into each batch
    for report in &reports {
        assert_eq!(report.episode_lengths, vec![20; 5]);
        assert_eq!(report.episode_returns.len(), report.episode_lengths.len());
        assert!(report.episode_returns.iter().all(|r| r.is_finite() && *r <= 0.0));
    }
    assert_eq!(summary.episodes, 10);
    assert_eq!(reports[1].episodes_so_far, 10);
}

#[test]
fn test_learn_rejects_invalid_config() {
    let mut env = PointEnv::new(20);
    let config = small_config().with_max_timesteps(10);
    let result = learn::<TestBackend, _, _, _>(
        &mut env,
        &MlpPolicyConfig::default(),
        &config,
        &device(),
        |_| panic!("callback must not run"),
    );
    assert!(result.is_err());
}

#[test]
fn test_learn_updates_observation_normalizer() {
    let mut env = PointEnv::new(20);
    let config = small_config();
    let summary = learn::<TestBackend, _, _, _>(
        &mut env,
        &MlpPolicyConfig::new().with_hidden_size(8),
        &config,
        &device(),
        |_| {},
    )
    .unwrap();

    let rms = summary.policy.obs_rms();
    assert_eq!(rms.dim(), 2);
    assert!((rms.count() - 200.0).abs() < 1e-9);
    // Targets alternate between -0.5 and 0.5 across episodes
    assert!(rms.mean()[1].abs() < 0.5);
}
