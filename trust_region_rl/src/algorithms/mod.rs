//! TRPO building blocks.
//!
//! - [`gae`]: advantage estimation
//! - [`conjugate_gradient`]: matrix-free linear solver
//! - [`gaussian_policy`]: policy parameters, distribution math, factory
//! - [`value_function`]: value baseline and its regression
//! - [`rollout`]: fixed-horizon segment collection
//! - [`trpo`]: the policy step and the training loop

pub mod config;
pub mod conjugate_gradient;
pub mod gae;
pub mod gaussian_policy;
pub mod rollout;
pub mod trpo;
pub mod value_function;

#[cfg(test)]
mod tests;
