//! TRPO hyperparameters.

use serde::{Deserialize, Serialize};

use crate::error::{TrpoError, TrpoResult};

/// Hyperparameters of the trust region routine.
///
/// Defaults are tuned for a 25 Hz single-joint reacher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrpoConfig {
    /// Stop after this many environment steps.
    pub max_timesteps: usize,
    /// Environment steps per policy update.
    pub timesteps_per_batch: usize,
    /// Mean KL bound of one policy update.
    pub max_kl: f32,
    /// Conjugate gradient iterations.
    pub cg_iters: usize,
    /// Damping added to Fisher-vector products.
    pub cg_damping: f32,
    /// Value function epochs per batch.
    pub vf_iters: usize,
    /// Value function Adam step size.
    pub vf_stepsize: f64,
    /// Value function minibatch size.
    pub vf_batch_size: usize,
    /// Discount factor.
    pub gamma: f32,
    /// GAE λ.
    pub lam: f32,
    /// Entropy bonus coefficient in the surrogate.
    pub entcoeff: f32,
    /// Line search halvings before the update is abandoned.
    pub max_backtracks: usize,
    /// Every n-th sample enters the Fisher-vector product.
    pub fvp_subsample: usize,
    /// Seed of the minibatch shuffling generator.
    pub seed: u64,
}

impl Default for TrpoConfig {
    fn default() -> Self {
        Self {
            max_timesteps: 50_000,
            timesteps_per_batch: 2048,
            max_kl: 0.05,
            cg_iters: 10,
            cg_damping: 0.1,
            vf_iters: 5,
            vf_stepsize: 1e-3,
            vf_batch_size: 64,
            gamma: 0.995,
            lam: 0.995,
            entcoeff: 0.0,
            max_backtracks: 10,
            fvp_subsample: 5,
            seed: 1,
        }
    }
}

impl TrpoConfig {
    /// Create a config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the total step budget.
    pub fn with_max_timesteps(mut self, steps: usize) -> Self {
        self.max_timesteps = steps;
        self
    }

    /// Set the number of steps per batch.
    pub fn with_timesteps_per_batch(mut self, steps: usize) -> Self {
        self.timesteps_per_batch = steps;
        self
    }

    /// Set the KL bound.
    pub fn with_max_kl(mut self, max_kl: f32) -> Self {
        self.max_kl = max_kl;
        self
    }

    /// Set conjugate gradient iterations and damping.
    pub fn with_cg(mut self, iters: usize, damping: f32) -> Self {
        self.cg_iters = iters;
        self.cg_damping = damping;
        self
    }

    /// Set value function epochs and step size.
    pub fn with_vf(mut self, iters: usize, stepsize: f64) -> Self {
        self.vf_iters = iters;
        self.vf_stepsize = stepsize;
        self
    }

    /// Set the value function minibatch size.
    pub fn with_vf_batch_size(mut self, batch_size: usize) -> Self {
        self.vf_batch_size = batch_size;
        self
    }

    /// Set discount and GAE λ.
    pub fn with_gamma_lam(mut self, gamma: f32, lam: f32) -> Self {
        self.gamma = gamma;
        self.lam = lam;
        self
    }

    /// Set the entropy coefficient.
    pub fn with_entcoeff(mut self, entcoeff: f32) -> Self {
        self.entcoeff = entcoeff;
        self
    }

    /// Set the shuffling seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check every hyperparameter.
    pub fn validate(&self) -> TrpoResult<()> {
        fn invalid(param: &'static str, message: impl Into<String>) -> TrpoResult<()> {
            Err(TrpoError::InvalidConfig {
                param,
                message: message.into(),
            })
        }

        if self.timesteps_per_batch == 0 {
            return invalid("timesteps_per_batch", "must be at least 1");
        }
        if self.max_timesteps < self.timesteps_per_batch {
            return invalid(
                "max_timesteps",
                format!(
                    "{} is smaller than one batch ({})",
                    self.max_timesteps, self.timesteps_per_batch
                ),
            );
        }
        if !(self.max_kl > 0.0) {
            return invalid("max_kl", "must be positive");
        }
        if self.cg_iters == 0 {
            return invalid("cg_iters", "must be at least 1");
        }
        if self.cg_damping < 0.0 {
            return invalid("cg_damping", "must be non-negative");
        }
        if !(self.vf_stepsize > 0.0) {
            return invalid("vf_stepsize", "must be positive");
        }
        if self.vf_batch_size == 0 {
            return invalid("vf_batch_size", "must be at least 1");
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return invalid("gamma", format!("{} not in [0, 1]", self.gamma));
        }
        if !(0.0..=1.0).contains(&self.lam) {
            return invalid("lam", format!("{} not in [0, 1]", self.lam));
        }
        if self.fvp_subsample == 0 {
            return invalid("fvp_subsample", "must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = TrpoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timesteps_per_batch, 2048);
        assert_eq!(config.max_timesteps, 50_000);
        assert_eq!(config.cg_iters, 10);
        assert!((config.gamma - 0.995).abs() < 1e-7);
        assert!((config.lam - 0.995).abs() < 1e-7);
    }

    #[test]
    fn test_builder() {
        let config = TrpoConfig::new()
            .with_max_timesteps(400)
            .with_timesteps_per_batch(100)
            .with_max_kl(0.01)
            .with_cg(5, 0.2)
            .with_vf(3, 1e-2);
        assert_eq!(config.max_timesteps, 400);
        assert_eq!(config.timesteps_per_batch, 100);
        assert_eq!(config.cg_iters, 5);
        assert_eq!(config.vf_iters, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_budget_below_one_batch() {
        let config = TrpoConfig::new().with_max_timesteps(10).with_timesteps_per_batch(100);
        match config.validate() {
            Err(TrpoError::InvalidConfig { param, .. }) => assert_eq!(param, "max_timesteps"),
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_kl_and_gamma() {
        assert!(TrpoConfig::new().with_max_kl(0.0).validate().is_err());
        assert!(TrpoConfig::new().with_max_kl(f32::NAN).validate().is_err());
        assert!(TrpoConfig::new().with_gamma_lam(1.5, 0.9).validate().is_err());
    }
}
