//! Diagonal Gaussian policy with a tanh MLP mean and state-independent log std.
//!
//! The policy keeps its parameters as one flat `f32` vector. Trust region
//! updates work in that flat space (conjugate gradient, line search), and the
//! vector is turned into burn tensors on whichever backend needs them:
//! autodiff for gradients, the inner backend for acting and evaluation.
//!
//! Flat layout: `[W_0, b_0, W_1, b_1, ..., W_L, b_L, log_std]`, where `W_l` is
//! row-major `[in, out]`.

use std::f32::consts::PI;
use std::ops::Range;

use burn::tensor::activation::tanh;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::{Distribution, Tensor, TensorData};
use serde::{Deserialize, Serialize};

use crate::core::running_stats::RunningMeanStd;
use crate::error::{TrpoError, TrpoResult};

/// Read a tensor back into host memory.
pub(crate) fn to_vec<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> TrpoResult<Vec<f32>> {
    tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| TrpoError::Tensor(format!("{:?}", e)))
}

/// Build a `[rows, cols]` tensor from row-major host data.
pub(crate) fn tensor2<B: Backend>(data: Vec<f32>, rows: usize, cols: usize, device: &B::Device) -> Tensor<B, 2> {
    Tensor::from_data(TensorData::new(data, [rows, cols]), device)
}

/// Build a rank-1 tensor from host data.
pub(crate) fn tensor1<B: Backend>(data: Vec<f32>, device: &B::Device) -> Tensor<B, 1> {
    let n = data.len();
    Tensor::from_data(TensorData::new(data, [n]), device)
}

// ============================================================================
// Configuration / factory
// ============================================================================

/// Shape and initialization of a [`GaussianMlpPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlpPolicyConfig {
    /// Units per hidden layer.
    pub hidden_size: usize,
    /// Number of hidden layers.
    pub num_hidden_layers: usize,
    /// Initial value of every log std entry.
    pub init_log_std: f32,
    /// Normalized observations are clipped to `[-obs_clip, obs_clip]`.
    pub obs_clip: f32,
}

impl Default for MlpPolicyConfig {
    fn default() -> Self {
        Self {
            hidden_size: 32,
            num_hidden_layers: 2,
            init_log_std: 0.0,
            obs_clip: 5.0,
        }
    }
}

impl MlpPolicyConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set units per hidden layer.
    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    /// Set the number of hidden layers.
    pub fn with_num_hidden_layers(mut self, layers: usize) -> Self {
        self.num_hidden_layers = layers;
        self
    }

    /// Set the initial log std.
    pub fn with_init_log_std(mut self, log_std: f32) -> Self {
        self.init_log_std = log_std;
        self
    }

    /// Check the configuration.
    pub fn validate(&self) -> TrpoResult<()> {
        if self.hidden_size == 0 {
            return Err(TrpoError::InvalidConfig {
                param: "hidden_size",
                message: "must be at least 1".to_string(),
            });
        }
        if !(self.obs_clip > 0.0) {
            return Err(TrpoError::InvalidConfig {
                param: "obs_clip",
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Builds the policy network for a given environment shape.
pub trait PolicyFactory {
    /// Create a freshly initialized policy named `name`.
    fn build<B: Backend>(
        &self,
        name: &str,
        observation_size: usize,
        action_dim: usize,
        device: &B::Device,
    ) -> TrpoResult<GaussianMlpPolicy>;
}

impl PolicyFactory for MlpPolicyConfig {
    fn build<B: Backend>(
        &self,
        name: &str,
        observation_size: usize,
        action_dim: usize,
        device: &B::Device,
    ) -> TrpoResult<GaussianMlpPolicy> {
        self.validate()?;
        GaussianMlpPolicy::init::<B>(name, self, observation_size, action_dim, device)
    }
}

// ============================================================================
// Layout
// ============================================================================

/// Positions of each parameter block inside the flat vector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyLayout {
    /// `[obs, hidden.., action]`
    layer_sizes: Vec<usize>,
}

impl PolicyLayout {
    /// Layout for an MLP with the given hidden widths.
    pub fn new(observation_size: usize, hidden: &[usize], action_dim: usize) -> Self {
        let mut layer_sizes = Vec::with_capacity(hidden.len() + 2);
        layer_sizes.push(observation_size);
        layer_sizes.extend_from_slice(hidden);
        layer_sizes.push(action_dim);
        Self { layer_sizes }
    }

    /// Number of affine layers (hidden + output).
    pub fn num_layers(&self) -> usize {
        self.layer_sizes.len() - 1
    }

    pub fn observation_size(&self) -> usize {
        self.layer_sizes[0]
    }

    pub fn action_dim(&self) -> usize {
        self.layer_sizes[self.layer_sizes.len() - 1]
    }

    /// Widths of the hidden layers.
    pub fn hidden_sizes(&self) -> &[usize] {
        &self.layer_sizes[1..self.layer_sizes.len() - 1]
    }

    /// `(in, out)` of layer `l`.
    pub fn layer_shape(&self, l: usize) -> (usize, usize) {
        (self.layer_sizes[l], self.layer_sizes[l + 1])
    }

    fn layer_offset(&self, l: usize) -> usize {
        (0..l)
            .map(|i| {
                let (fan_in, fan_out) = self.layer_shape(i);
                fan_in * fan_out + fan_out
            })
            .sum()
    }

    /// Flat range of `W_l`.
    pub fn weight_range(&self, l: usize) -> Range<usize> {
        let start = self.layer_offset(l);
        let (fan_in, fan_out) = self.layer_shape(l);
        start..start + fan_in * fan_out
    }

    /// Flat range of `b_l`.
    pub fn bias_range(&self, l: usize) -> Range<usize> {
        let start = self.weight_range(l).end;
        start..start + self.layer_shape(l).1
    }

    /// Flat range of the log std block.
    pub fn log_std_range(&self) -> Range<usize> {
        let start = self.layer_offset(self.num_layers());
        start..start + self.action_dim()
    }

    /// Total number of parameters.
    pub fn num_params(&self) -> usize {
        self.log_std_range().end
    }
}

// ============================================================================
// Tensors
// ============================================================================

/// Parameter tensors of the policy on backend `B`.
#[derive(Debug, Clone)]
pub struct PolicyTensors<B: Backend> {
    pub weights: Vec<Tensor<B, 2>>,
    pub biases: Vec<Tensor<B, 1>>,
    pub log_std: Tensor<B, 1>,
}

impl<B: Backend> PolicyTensors<B> {
    /// Split a flat vector (parameters or a tangent) into tensors.
    pub fn from_flat(layout: &PolicyLayout, flat: &[f32], device: &B::Device) -> Self {
        assert_eq!(flat.len(), layout.num_params(), "flat vector does not match layout");
        let mut weights = Vec::with_capacity(layout.num_layers());
        let mut biases = Vec::with_capacity(layout.num_layers());
        for l in 0..layout.num_layers() {
            let (fan_in, fan_out) = layout.layer_shape(l);
            weights.push(tensor2(flat[layout.weight_range(l)].to_vec(), fan_in, fan_out, device));
            biases.push(tensor1(flat[layout.bias_range(l)].to_vec(), device));
        }
        let log_std = tensor1(flat[layout.log_std_range()].to_vec(), device);
        Self {
            weights,
            biases,
            log_std,
        }
    }

    /// Action mean for a batch of normalized observations [N, obs] -> [N, act].
    pub fn mean(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.weights.len() - 1;
        let mut h = obs;
        for (l, (w, b)) in self.weights.iter().zip(&self.biases).enumerate() {
            let z = h.matmul(w.clone()) + b.clone().unsqueeze_dim::<2>(0);
            h = if l == last { z } else { tanh(z) };
        }
        h
    }

    /// Forward-mode derivative of the mean along `tangent` (a flat-space direction).
    ///
    /// Returns `J v` with shape [N, act], where `J = ∂mean/∂θ`.
    pub fn mean_jvp(&self, tangent: &PolicyTensors<B>, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.weights.len() - 1;
        let mut h = obs;
        let mut dh: Option<Tensor<B, 2>> = None;

        for l in 0..self.weights.len() {
            let w = self.weights[l].clone();
            let z = h.clone().matmul(w.clone()) + self.biases[l].clone().unsqueeze_dim::<2>(0);
            let mut dz = h.matmul(tangent.weights[l].clone())
                + tangent.biases[l].clone().unsqueeze_dim::<2>(0);
            if let Some(dh) = dh.take() {
                dz = dz + dh.matmul(w);
            }
            if l == last {
                return dz;
            }
            let a = tanh(z);
            // d tanh(z) = (1 - tanh(z)^2) dz
            dh = Some(a.clone().powf_scalar(2.0).neg().add_scalar(1.0) * dz);
            h = a;
        }
        unreachable!("policy has at least one layer")
    }
}

impl<B: AutodiffBackend> PolicyTensors<B> {
    /// Mark every parameter tensor as a gradient leaf.
    pub fn require_grad(self) -> Self {
        Self {
            weights: self.weights.into_iter().map(|w| w.require_grad()).collect(),
            biases: self.biases.into_iter().map(|b| b.require_grad()).collect(),
            log_std: self.log_std.require_grad(),
        }
    }

    /// Collect gradients back into flat layout; parameters outside the graph get zeros.
    pub fn grads_to_flat(&self, layout: &PolicyLayout, grads: &B::Gradients) -> TrpoResult<Vec<f32>> {
        let mut flat = vec![0.0f32; layout.num_params()];
        for l in 0..layout.num_layers() {
            if let Some(g) = self.weights[l].grad(grads) {
                flat[layout.weight_range(l)].copy_from_slice(&to_vec(g)?);
            }
            if let Some(g) = self.biases[l].grad(grads) {
                flat[layout.bias_range(l)].copy_from_slice(&to_vec(g)?);
            }
        }
        if let Some(g) = self.log_std.grad(grads) {
            flat[layout.log_std_range()].copy_from_slice(&to_vec(g)?);
        }
        Ok(flat)
    }
}

// ============================================================================
// Distribution math
// ============================================================================

/// log N(actions | mean, exp(log_std)) summed over action dims -> [N, 1].
pub fn log_prob<B: Backend>(mean: Tensor<B, 2>, log_std: Tensor<B, 1>, actions: Tensor<B, 2>) -> Tensor<B, 2> {
    let action_dim = log_std.dims()[0] as f32;
    let std = log_std.clone().exp().unsqueeze_dim::<2>(0);
    let z = (actions - mean) / std;
    z.powf_scalar(2.0)
        .sum_dim(1)
        .mul_scalar(-0.5)
        .sub(log_std.sum().unsqueeze_dim::<2>(0))
        .sub_scalar(0.5 * (2.0 * PI).ln() * action_dim)
}

/// Differential entropy of the diagonal Gaussian -> [1].
pub fn entropy<B: Backend>(log_std: Tensor<B, 1>) -> Tensor<B, 1> {
    let action_dim = log_std.dims()[0] as f32;
    log_std
        .sum()
        .add_scalar(0.5 * (2.0 * PI * std::f32::consts::E).ln() * action_dim)
}

/// KL(old || new) per sample -> [N, 1].
pub fn kl_divergence<B: Backend>(
    old_mean: Tensor<B, 2>,
    old_log_std: Tensor<B, 1>,
    new_mean: Tensor<B, 2>,
    new_log_std: Tensor<B, 1>,
) -> Tensor<B, 2> {
    let old_var = old_log_std.clone().mul_scalar(2.0).exp().unsqueeze_dim::<2>(0);
    let new_var = new_log_std.clone().mul_scalar(2.0).exp().unsqueeze_dim::<2>(0);
    let log_ratio = (new_log_std - old_log_std).unsqueeze_dim::<2>(0);
    let mean_diff_sq = (old_mean - new_mean).powf_scalar(2.0);
    (log_ratio + (mean_diff_sq + old_var) / new_var.mul_scalar(2.0))
        .sub_scalar(0.5)
        .sum_dim(1)
}

// ============================================================================
// Policy
// ============================================================================

/// Gaussian MLP policy with observation normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianMlpPolicy {
    name: String,
    layout: PolicyLayout,
    params: Vec<f32>,
    obs_rms: RunningMeanStd,
    obs_clip: f32,
}

impl GaussianMlpPolicy {
    /// Initialize a policy.
    ///
    /// Weights use column-normalized Gaussian init (unit column norm for
    /// hidden layers, 0.01 for the output layer so initial actions stay near
    /// zero). Biases start at zero.
    pub fn init<B: Backend>(
        name: &str,
        config: &MlpPolicyConfig,
        observation_size: usize,
        action_dim: usize,
        device: &B::Device,
    ) -> TrpoResult<Self> {
        let hidden = vec![config.hidden_size; config.num_hidden_layers];
        let layout = PolicyLayout::new(observation_size, &hidden, action_dim);
        let mut params = vec![0.0f32; layout.num_params()];

        for l in 0..layout.num_layers() {
            let (fan_in, fan_out) = layout.layer_shape(l);
            let gain = if l + 1 == layout.num_layers() { 0.01 } else { 1.0 };
            let raw = Tensor::<B, 2>::random([fan_in, fan_out], Distribution::Normal(0.0, 1.0), device);
            let norms = raw.clone().powf_scalar(2.0).sum_dim(0).sqrt();
            let w = (raw / norms.clamp_min(1e-8)).mul_scalar(gain);
            params[layout.weight_range(l)].copy_from_slice(&to_vec(w)?);
        }
        params[layout.log_std_range()].fill(config.init_log_std);

        log::debug!(
            "policy '{}' initialized: layers {:?}, {} parameters",
            name,
            layout.layer_sizes,
            layout.num_params()
        );

        Ok(Self {
            name: name.to_string(),
            layout,
            params,
            obs_rms: RunningMeanStd::new(observation_size),
            obs_clip: config.obs_clip,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &PolicyLayout {
        &self.layout
    }

    /// Flat parameter vector.
    pub fn flat_params(&self) -> &[f32] {
        &self.params
    }

    /// Replace the flat parameter vector.
    pub fn set_flat_params(&mut self, params: &[f32]) -> TrpoResult<()> {
        if params.len() != self.params.len() {
            return Err(TrpoError::DimensionMismatch {
                expected: self.params.len(),
                actual: params.len(),
            });
        }
        self.params.copy_from_slice(params);
        Ok(())
    }

    /// Current log std per action dimension.
    pub fn log_std(&self) -> &[f32] {
        &self.params[self.layout.log_std_range()]
    }

    pub fn obs_rms(&self) -> &RunningMeanStd {
        &self.obs_rms
    }

    /// Fold a flattened observation batch into the normalizer.
    pub fn update_obs_rms(&mut self, observations: &[f32]) {
        self.obs_rms.update_batch(observations);
    }

    /// Normalize and clip a flattened observation batch.
    pub fn normalize_observations(&self, observations: &[f32]) -> Vec<f32> {
        let mut out = observations.to_vec();
        self.obs_rms.normalize_batch_inplace(&mut out, self.obs_clip);
        out
    }

    /// Parameter tensors on backend `B`.
    pub fn tensors<B: Backend>(&self, device: &B::Device) -> PolicyTensors<B> {
        PolicyTensors::from_flat(&self.layout, &self.params, device)
    }

    /// Freeze the current parameters and normalizer for acting.
    pub fn actor<B: Backend>(&self, device: &B::Device) -> PolicyActor<B> {
        PolicyActor {
            tensors: self.tensors(device),
            obs_rms: self.obs_rms.clone(),
            obs_clip: self.obs_clip,
            device: device.clone(),
        }
    }
}

/// Snapshot of a policy used to pick actions during a rollout.
#[derive(Debug, Clone)]
pub struct PolicyActor<B: Backend> {
    tensors: PolicyTensors<B>,
    obs_rms: RunningMeanStd,
    obs_clip: f32,
    device: B::Device,
}

impl<B: Backend> PolicyActor<B> {
    /// Normalized observation as a [1, obs] tensor.
    pub fn normalized(&self, observation: &[f32]) -> Tensor<B, 2> {
        let norm = self.obs_rms.normalize_and_clip(observation, self.obs_clip);
        let n = norm.len();
        tensor2(norm, 1, n, &self.device)
    }

    /// Sample an action (or return the mean when `stochastic` is false).
    pub fn act(&self, observation: &[f32], stochastic: bool) -> TrpoResult<Vec<f32>> {
        let mean = self.tensors.mean(self.normalized(observation));
        let action = if stochastic {
            let dims = mean.dims();
            let noise = Tensor::<B, 2>::random(dims, Distribution::Normal(0.0, 1.0), &self.device);
            let std = self.tensors.log_std.clone().exp().unsqueeze_dim::<2>(0);
            mean + noise * std
        } else {
            mean
        };
        to_vec(action)
    }
}
