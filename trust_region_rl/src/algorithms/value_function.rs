//! State-value baseline trained by regression on λ-returns.

use burn::module::Module;
use burn::nn::{Linear, LinearConfig};
use burn::optim::{GradientsParams, Optimizer};
use burn::tensor::activation::tanh;
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;
use rand::seq::SliceRandom;
use rand::Rng;

use super::gaussian_policy::{tensor2, to_vec};

/// Tanh MLP mapping a normalized observation to a scalar value.
#[derive(Module, Debug)]
pub struct ValueMlp<B: Backend> {
    hidden: Vec<Linear<B>>,
    head: Linear<B>,
}

impl<B: Backend> ValueMlp<B> {
    /// Create a value network with the given hidden widths.
    pub fn new(observation_size: usize, hidden_sizes: &[usize], device: &B::Device) -> Self {
        let mut hidden = Vec::with_capacity(hidden_sizes.len());
        let mut fan_in = observation_size;
        for &width in hidden_sizes {
            hidden.push(LinearConfig::new(fan_in, width).init(device));
            fan_in = width;
        }
        Self {
            hidden,
            head: LinearConfig::new(fan_in, 1).init(device),
        }
    }

    /// [N, obs] -> [N, 1]
    pub fn forward(&self, obs: Tensor<B, 2>) -> Tensor<B, 2> {
        let mut h = obs;
        for layer in &self.hidden {
            h = tanh(layer.forward(h));
        }
        self.head.forward(h)
    }
}

/// Fit the value network to `targets` with shuffled minibatch regression.
///
/// Runs `epochs` passes; only full minibatches are used unless the whole
/// batch is smaller than one minibatch. Returns the trained model and the
/// mean squared error of the last epoch.
#[allow(clippy::too_many_arguments)]
pub fn fit_value<B, O, R>(
    mut model: ValueMlp<B>,
    optimizer: &mut O,
    normalized_obs: &[f32],
    targets: &[f32],
    observation_size: usize,
    epochs: usize,
    batch_size: usize,
    learning_rate: f64,
    rng: &mut R,
    device: &B::Device,
) -> (ValueMlp<B>, f32)
where
    B: AutodiffBackend,
    O: Optimizer<ValueMlp<B>, B>,
    R: Rng,
{
    let n = targets.len();
    let batch_size = batch_size.min(n.max(1));
    let mut indices: Vec<usize> = (0..n).collect();
    let mut last_epoch_loss = 0.0f32;

    for _ in 0..epochs {
        indices.shuffle(rng);
        let mut epoch_loss = 0.0f32;
        let mut batches = 0usize;

        for chunk in indices.chunks_exact(batch_size) {
            let mut obs = Vec::with_capacity(chunk.len() * observation_size);
            let mut ret = Vec::with_capacity(chunk.len());
            for &i in chunk {
                obs.extend_from_slice(&normalized_obs[i * observation_size..(i + 1) * observation_size]);
                ret.push(targets[i]);
            }
            let obs = tensor2::<B>(obs, chunk.len(), observation_size, device);
            let ret = tensor2::<B>(ret, chunk.len(), 1, device);

            let loss = (model.forward(obs) - ret).powf_scalar(2.0).mean();
            if let Ok(v) = to_vec(loss.clone().inner()) {
                epoch_loss += v[0];
            }
            batches += 1;

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optimizer.step(learning_rate, model, grads);
        }

        if batches > 0 {
            last_epoch_loss = epoch_loss / batches as f32;
        }
    }

    (model, last_epoch_loss)
}
