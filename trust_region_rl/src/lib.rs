//! # Trust Region RL: TRPO on burn
//!
//! Single-environment trust region policy optimization for continuous control,
//! built for slow, real-time environments such as physical actuators where one
//! environment step takes tens of milliseconds.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                         trpo::learn                              │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  SegmentCollector ──► Segment ──► GAE ──► policy_step             │
//! │        ▲                                   │  surrogate grad      │
//! │        │                                   │  Fisher-vector prod  │
//! │  GaussianMlpPolicy ◄───────────────────────┘  conjugate gradient  │
//! │  ValueMlp (Adam)                              line search         │
//! │                                                                   │
//! │  callback(&BatchReport) ──► SharedTrainingRecord ──► plotter      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The trainer thread owns the environment and the networks. Anything that
//! another thread needs to observe goes through [`core::SharedTrainingRecord`]
//! and [`core::RunSignal`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use trust_region_rl::{trpo, MlpPolicyConfig, TrpoConfig, training_record};
//!
//! let record = training_record();
//! let config = TrpoConfig::default().with_max_timesteps(50_000);
//! let policy = MlpPolicyConfig::new().with_hidden_size(32).with_num_hidden_layers(2);
//!
//! let summary = trpo::learn::<MyBackend, _, _, _>(&mut env, &policy, &config, &device, |report| {
//!     record.append_batch(&report.episode_returns, &report.episode_lengths);
//! })?;
//! ```

pub mod algorithms;
pub mod core;
pub mod environment;
pub mod error;
pub mod metrics;
pub mod seeding;

pub use algorithms::config::TrpoConfig;
pub use algorithms::gaussian_policy::{GaussianMlpPolicy, MlpPolicyConfig, PolicyFactory};
pub use algorithms::trpo::{self, BatchReport, TrainingSummary};
pub use core::record::{training_record, SharedTrainingRecord, TrainingRecord};
pub use core::run_signal::RunSignal;
pub use core::running_stats::RunningMeanStd;
pub use environment::{Environment, Step};
pub use error::{TrpoError, TrpoResult};
