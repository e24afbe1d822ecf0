//! Trust Region Policy Optimization.
//!
//! Each iteration collects one fixed-horizon segment, estimates advantages
//! with GAE, takes one natural-gradient step on the policy under a mean KL
//! bound, and regresses the value baseline on λ-returns.
//!
//! ## Policy step
//!
//! ```text
//! g        = ∇θ L(θ)                      surrogate gradient (autodiff)
//! s        ≈ F⁻¹ g                        conjugate gradient on F v products
//! β        = sqrt(2 δ / sᵀ F s)           scale to the KL bound δ
//! θ'       = θ + 2^-k β s                 backtracking, k = 0..max_backtracks
//! ```
//!
//! `F` is the Fisher matrix of the Gaussian policy, computed analytically:
//! `(1/N) Σ Jᵀ diag(1/σ²) J` for the mean parameters and `2 I` for log std.
//!
//! ## References
//!
//! - Schulman et al., "Trust Region Policy Optimization" (2015)

use burn::module::AutodiffModule;
use burn::optim::AdamConfig;
use burn::tensor::backend::AutodiffBackend;
use burn::tensor::Tensor;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::config::TrpoConfig;
use super::conjugate_gradient::{axpy, conjugate_gradient, dot};
use super::gae::{compute_gae, standardize};
use super::gaussian_policy::{
    entropy, kl_divergence, log_prob, tensor2, to_vec, GaussianMlpPolicy, PolicyFactory,
    PolicyLayout, PolicyTensors,
};
use super::rollout::SegmentCollector;
use super::value_function::{fit_value, ValueMlp};
use crate::environment::Environment;
use crate::error::TrpoResult;
use crate::metrics::{ConsoleLogger, EpisodeWindow, IterationSnapshot, MetricsLogger};

/// Number of recent episodes averaged in the progress log.
const EPISODE_WINDOW: usize = 40;

/// Delivered to the batch callback after every policy update.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Iteration number (1-based).
    pub iteration: usize,
    /// Environment steps collected so far, including this batch.
    pub timesteps_so_far: usize,
    /// Episodes completed so far, including this batch.
    pub episodes_so_far: usize,
    /// Returns of the episodes completed in this batch.
    pub episode_returns: Vec<f32>,
    /// Lengths of the episodes completed in this batch.
    pub episode_lengths: Vec<u64>,
    /// Whether the line search accepted a step.
    pub step_accepted: bool,
    /// Mean KL between the old and new policy.
    pub mean_kl: f32,
    /// Surrogate improvement of the accepted step.
    pub surrogate_improvement: f32,
    /// Value regression loss of the last epoch.
    pub value_loss: f32,
    /// Policy entropy after the update.
    pub entropy: f32,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub iterations: usize,
    pub timesteps: usize,
    pub episodes: usize,
    /// Trained policy.
    pub policy: GaussianMlpPolicy,
}

/// Outcome of one policy step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyStepStats {
    pub accepted: bool,
    pub mean_kl: f32,
    pub improvement: f32,
    pub expected_improvement: f32,
    pub entropy: f32,
}

/// Surrogate objective, mean KL and entropy at some parameter vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyLosses {
    pub surrogate: f32,
    pub mean_kl: f32,
    pub entropy: f32,
}

impl PolicyLosses {
    fn is_finite(&self) -> bool {
        self.surrogate.is_finite() && self.mean_kl.is_finite() && self.entropy.is_finite()
    }
}

/// Tensors of one policy update, fixed at the pre-update parameters.
pub struct PolicyBatch<B: AutodiffBackend> {
    layout: PolicyLayout,
    theta_old: Vec<f32>,
    observations: Tensor<B::InnerBackend, 2>,
    actions: Tensor<B::InnerBackend, 2>,
    advantages: Tensor<B::InnerBackend, 2>,
    old_log_prob: Tensor<B::InnerBackend, 2>,
    old_mean: Tensor<B::InnerBackend, 2>,
    old_log_std: Tensor<B::InnerBackend, 1>,
    fvp_observations: Tensor<B::InnerBackend, 2>,
    entcoeff: f32,
    device: B::Device,
}

impl<B: AutodiffBackend> PolicyBatch<B> {
    /// Freeze the batch at the policy's current parameters.
    ///
    /// `normalized_obs` must already be normalized with the policy's
    /// statistics. Every `fvp_subsample`-th sample is kept for Fisher-vector
    /// products.
    pub fn new(
        policy: &GaussianMlpPolicy,
        normalized_obs: &[f32],
        actions: &[f32],
        advantages: &[f32],
        fvp_subsample: usize,
        entcoeff: f32,
        device: &B::Device,
    ) -> Self {
        let layout = policy.layout().clone();
        let obs_size = layout.observation_size();
        let action_dim = layout.action_dim();
        let n = advantages.len();

        let observations = tensor2::<B::InnerBackend>(normalized_obs.to_vec(), n, obs_size, device);
        let actions = tensor2::<B::InnerBackend>(actions.to_vec(), n, action_dim, device);
        let advantages = tensor2::<B::InnerBackend>(advantages.to_vec(), n, 1, device);

        let fvp_rows: Vec<f32> = normalized_obs
            .chunks_exact(obs_size)
            .step_by(fvp_subsample.max(1))
            .flatten()
            .copied()
            .collect();
        let m = fvp_rows.len() / obs_size;
        let fvp_observations = tensor2::<B::InnerBackend>(fvp_rows, m, obs_size, device);

        let old = policy.tensors::<B::InnerBackend>(device);
        let old_mean = old.mean(observations.clone());
        let old_log_prob = log_prob(old_mean.clone(), old.log_std.clone(), actions.clone());

        Self {
            layout,
            theta_old: policy.flat_params().to_vec(),
            observations,
            actions,
            advantages,
            old_log_prob,
            old_mean,
            old_log_std: old.log_std,
            fvp_observations,
            entcoeff,
            device: device.clone(),
        }
    }

    /// Parameters the batch was frozen at.
    pub fn theta_old(&self) -> &[f32] {
        &self.theta_old
    }

    /// Evaluate surrogate, KL to the old policy, and entropy at `theta`.
    pub fn losses(&self, theta: &[f32]) -> TrpoResult<PolicyLosses> {
        let t = PolicyTensors::<B::InnerBackend>::from_flat(&self.layout, theta, &self.device);
        let mean = t.mean(self.observations.clone());
        let logp = log_prob(mean.clone(), t.log_std.clone(), self.actions.clone());
        let ratio = (logp - self.old_log_prob.clone()).exp();
        let surrgain = (ratio * self.advantages.clone()).mean();
        let ent = entropy(t.log_std.clone());
        let kl = kl_divergence(
            self.old_mean.clone(),
            self.old_log_std.clone(),
            mean,
            t.log_std,
        )
        .mean();

        let surrgain = to_vec(surrgain)?[0];
        let ent = to_vec(ent)?[0];
        Ok(PolicyLosses {
            surrogate: surrgain + self.entcoeff * ent,
            mean_kl: to_vec(kl)?[0],
            entropy: ent,
        })
    }

    /// Gradient of the surrogate objective at `theta`.
    pub fn surrogate_gradient(&self, theta: &[f32]) -> TrpoResult<Vec<f32>> {
        let t = PolicyTensors::<B>::from_flat(&self.layout, theta, &self.device).require_grad();
        let obs = Tensor::<B, 2>::from_inner(self.observations.clone());
        let actions = Tensor::<B, 2>::from_inner(self.actions.clone());
        let advantages = Tensor::<B, 2>::from_inner(self.advantages.clone());
        let old_logp = Tensor::<B, 2>::from_inner(self.old_log_prob.clone());

        let mean = t.mean(obs);
        let logp = log_prob(mean, t.log_std.clone(), actions);
        let surrgain = ((logp - old_logp).exp() * advantages).mean();
        let objective = surrgain + entropy(t.log_std.clone()).mul_scalar(self.entcoeff);

        let grads = objective.backward();
        t.grads_to_flat(&self.layout, &grads)
    }

    /// Fisher-vector product `F v` at the old parameters, without damping.
    pub fn fisher_vector_product(&self, v: &[f32]) -> TrpoResult<Vec<f32>> {
        let m = self.fvp_observations.dims()[0] as f32;
        let inner = PolicyTensors::<B::InnerBackend>::from_flat(&self.layout, &self.theta_old, &self.device);
        let tangent = PolicyTensors::<B::InnerBackend>::from_flat(&self.layout, v, &self.device);

        // u = diag(1/σ²) J v / M
        let jv = inner.mean_jvp(&tangent, self.fvp_observations.clone());
        let var = inner.log_std.clone().mul_scalar(2.0).exp().unsqueeze_dim::<2>(0);
        let u = (jv / var).div_scalar(m);

        // Jᵀ u through reverse mode
        let t = PolicyTensors::<B>::from_flat(&self.layout, &self.theta_old, &self.device).require_grad();
        let mean = t.mean(Tensor::<B, 2>::from_inner(self.fvp_observations.clone()));
        let contracted = (mean * Tensor::<B, 2>::from_inner(u)).sum();
        let grads = contracted.backward();
        let mut fv = t.grads_to_flat(&self.layout, &grads)?;

        for i in self.layout.log_std_range() {
            fv[i] = 2.0 * v[i];
        }
        Ok(fv)
    }
}

/// One natural-gradient step with backtracking line search.
///
/// The policy keeps its old parameters if no candidate passes the checks.
pub fn policy_step<B: AutodiffBackend>(
    policy: &mut GaussianMlpPolicy,
    batch: &PolicyBatch<B>,
    config: &TrpoConfig,
) -> TrpoResult<PolicyStepStats> {
    let theta = batch.theta_old().to_vec();
    let before = batch.losses(&theta)?;
    let mut stats = PolicyStepStats {
        accepted: false,
        mean_kl: 0.0,
        improvement: 0.0,
        expected_improvement: 0.0,
        entropy: before.entropy,
    };

    let g = batch.surrogate_gradient(&theta)?;
    if g.iter().all(|x| x.abs() < 1e-12) {
        log::warn!("got zero gradient, not updating");
        return Ok(stats);
    }

    let damping = config.cg_damping;
    let mut fvp_error = None;
    let mut fvp = |v: &[f32]| -> Vec<f32> {
        match batch.fisher_vector_product(v) {
            Ok(mut fv) => {
                axpy(damping, v, &mut fv);
                fv
            }
            Err(e) => {
                fvp_error.get_or_insert(e);
                vec![0.0; v.len()]
            }
        }
    };

    let stepdir = conjugate_gradient(&mut fvp, &g, config.cg_iters);
    let shs = 0.5 * dot(&stepdir, &fvp(&stepdir));
    if let Some(e) = fvp_error {
        return Err(e);
    }
    if !(shs > 0.0) || !shs.is_finite() {
        log::warn!("step direction has non-positive curvature ({}), not updating", shs);
        return Ok(stats);
    }

    let lm = (shs / config.max_kl).sqrt();
    let fullstep: Vec<f32> = stepdir.iter().map(|s| s / lm).collect();
    let expected_improvement = dot(&g, &fullstep);
    stats.expected_improvement = expected_improvement;
    log::debug!("lagrange multiplier {:.5}, gradient norm {:.5}", lm, dot(&g, &g).sqrt());

    let mut stepsize = 1.0f32;
    for _ in 0..config.max_backtracks {
        let mut candidate = theta.clone();
        axpy(stepsize, &fullstep, &mut candidate);
        let after = batch.losses(&candidate)?;
        let improvement = after.surrogate - before.surrogate;
        log::debug!(
            "expected {:.5}, actual {:.5}, kl {:.5}",
            expected_improvement * stepsize,
            improvement,
            after.mean_kl
        );

        if !after.is_finite() {
            log::debug!("got non-finite value of losses");
        } else if after.mean_kl > config.max_kl * 1.5 {
            log::debug!("violated KL constraint, shrinking step");
        } else if improvement < 0.0 {
            log::debug!("surrogate didn't improve, shrinking step");
        } else {
            policy.set_flat_params(&candidate)?;
            stats.accepted = true;
            stats.mean_kl = after.mean_kl;
            stats.improvement = improvement;
            stats.entropy = after.entropy;
            return Ok(stats);
        }
        stepsize *= 0.5;
    }

    log::info!("couldn't compute a good step, keeping old parameters");
    policy.set_flat_params(&theta)?;
    Ok(stats)
}

/// Train a policy built by `policy_factory` on `env`.
///
/// `callback` runs after every batch, once the policy and value function have
/// been updated. Training stops once `max_timesteps` steps were collected.
pub fn learn<B, E, F, C>(
    env: &mut E,
    policy_factory: &F,
    config: &TrpoConfig,
    device: &B::Device,
    mut callback: C,
) -> TrpoResult<TrainingSummary>
where
    B: AutodiffBackend,
    E: Environment,
    F: PolicyFactory,
    C: FnMut(&BatchReport),
{
    config.validate()?;

    let obs_size = env.observation_size();
    let mut policy = policy_factory.build::<B>("pi", obs_size, env.action_dim(), device)?;
    let mut value = ValueMlp::<B>::new(obs_size, policy.layout().hidden_sizes(), device);
    let mut vf_optim = AdamConfig::new().with_epsilon(1e-8).init::<B, ValueMlp<B>>();
    let mut rng = StdRng::seed_from_u64(config.seed);

    let mut collector = SegmentCollector::new();
    let mut logger = ConsoleLogger::new();
    let mut window = EpisodeWindow::new(EPISODE_WINDOW);

    let mut iteration = 0usize;
    let mut timesteps_so_far = 0usize;
    let mut episodes_so_far = 0usize;

    while timesteps_so_far < config.max_timesteps {
        iteration += 1;
        log::debug!("iteration {} starting at {} steps", iteration, timesteps_so_far);

        let actor = policy.actor::<B::InnerBackend>(device);
        let value_inner = value.valid();
        let segment = collector.collect(env, &actor, &value_inner, config.timesteps_per_batch)?;

        let (mut advantages, td_lam_ret) = compute_gae(
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

        let batch = PolicyBatch::<B>::new(
            &policy,
            &normalized,
            &segment.actions,
            &advantages,
            config.fvp_subsample,
            config.entcoeff,
            device,
        );
        let step = policy_step(&mut policy, &batch, config)?;

        let (trained, value_loss) = fit_value(
            value,
            &mut vf_optim,
            &normalized,
            &td_lam_ret,
            obs_size,
            config.vf_iters,
            config.vf_batch_size,
            config.vf_stepsize,
            &mut rng,
            device,
        );
        value = trained;

        timesteps_so_far += segment.len();
        episodes_so_far += segment.episode_returns.len();
        window.extend(&segment.episode_returns, &segment.episode_lengths);

        logger.log(
            &IterationSnapshot::new(iteration, timesteps_so_far, episodes_so_far)
                .with_episodes(segment.episode_returns.len(), &window)
                .with_policy_step(step.mean_kl, step.improvement, step.entropy)
                .with_value_loss(value_loss),
        );

        callback(&BatchReport {
            iteration,
            timesteps_so_far,
            episodes_so_far,
            episode_returns: segment.episode_returns,
            episode_lengths: segment.episode_lengths,
            step_accepted: step.accepted,
            mean_kl: step.mean_kl,
            surrogate_improvement: step.improvement,
            value_loss,
            entropy: step.entropy,
        });
    }

    Ok(TrainingSummary {
        iterations: iteration,
        timesteps: timesteps_so_far,
        episodes: episodes_so_far,
        policy,
    })
}
