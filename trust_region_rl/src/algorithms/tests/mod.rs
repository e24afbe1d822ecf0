//! Behavioral tests for the TRPO building blocks.
//!
//! Tests as Definition: each file pins down one part of the update:
//! - `gae_tests`: advantage estimation across episode boundaries
//! - `conjugate_gradient_tests`: the matrix-free solver
//! - `policy_tests`: Gaussian policy math, JVP and Fisher-vector products
//! - `trpo_tests`: line search guarantees and the training loop

mod trpo_tests;

use burn::backend::{Autodiff, NdArray};

pub(crate) type TestBackend = Autodiff<NdArray>;
pub(crate) type InnerBackend = NdArray;
