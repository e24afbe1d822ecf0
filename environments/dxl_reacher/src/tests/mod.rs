//! Tests for the DXL reacher environment and its dashboard.
//!
//! These tests follow the "Tests as Definition" philosophy: each module spells
//! out the behavior of one part of the crate.
//!
//! ## Organization
//!
//! - `env_tests`: Reacher lifecycle, observations, actions, rewards, episodes
//! - `learning_curve_tests`: Step axis, windowed averages, axis ranges
//! - `plotter_tests`: Plotting worker handshake and saved image

pub mod env_tests;
