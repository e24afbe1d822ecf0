//! One training session: reacher, plotter and learner wired together.
//!
//! ```text
//! start env ─→ spawn plotter ─→ learn (callback → record) ─→ stop plotter
//!                                                             │
//!                        close env ←─ join ←─ grace period ←──┘
//! ```
//!
//! Shutdown runs whether or not training succeeded.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use burn::backend::ndarray::NdArrayDevice;
use burn::backend::{Autodiff, NdArray};
use serde::{Deserialize, Serialize};

use dxl_reacher_env::renderer::{spawn_plotter, PlotConfig};
use dxl_reacher_env::{
    CommunicatorSetup, DxlCommunicatorConfig, DxlReacher1D, DxlSetup, EnvLifecycle, NormalizedEnv,
    ReacherConfig,
};
use trust_region_rl::seeding::seed_everything;
use trust_region_rl::{training_record, trpo, BatchReport, MlpPolicyConfig, RunSignal, TrainingSummary, TrpoConfig};

use crate::cli::Args;

type TrainBackend = Autodiff<NdArray>;

/// Everything a session needs besides the CLI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub communicator: DxlCommunicatorConfig,
    pub reacher: ReacherConfig,
    pub policy: MlpPolicyConfig,
    pub trpo: TrpoConfig,
    pub plot: PlotConfig,
    /// Seeds the tensor backend, the reacher and the learner.
    pub seed: u64,
    /// Wait between stopping the plotter and joining it.
    pub grace_period: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        let seed = 1;
        Self {
            communicator: DxlCommunicatorConfig::default(),
            reacher: ReacherConfig::new(DxlSetup::gripper_default()).with_seed(seed),
            policy: MlpPolicyConfig::new().with_hidden_size(32).with_num_hidden_layers(2),
            trpo: TrpoConfig::new().with_seed(seed),
            plot: PlotConfig::default(),
            seed,
            grace_period: Duration::from_secs(2),
        }
    }
}

impl SessionConfig {
    /// Defaults, with the servo connection taken from the command line.
    pub fn from_args(args: &Args) -> Self {
        let mut config = Self::default();
        config.communicator = config
            .communicator
            .with_idn(args.id)
            .with_baudrate(args.baud)
            .with_device_path(args.port.clone());
        config
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.communicator.validate().context("invalid communicator config")?;
        self.reacher.validate().context("invalid reacher config")?;
        self.policy.validate().context("invalid policy config")?;
        self.trpo.validate().context("invalid TRPO config")?;
        self.plot.validate().context("invalid plot config")?;
        Ok(())
    }

    fn communicator_setup(&self) -> CommunicatorSetup {
        CommunicatorSetup::new(
            self.reacher.actuator_name.clone(),
            self.reacher.obs_history,
            self.communicator.clone(),
        )
    }
}

/// Result of a finished session.
#[derive(Debug)]
pub struct SessionOutcome {
    /// Start time of the run, also the stem of the saved image.
    pub tag: String,
    pub image_path: PathBuf,
    pub summary: TrainingSummary,
}

/// Seconds since the Unix epoch, with sub-second digits.
fn run_tag() -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system clock is before the Unix epoch")?;
    Ok(format!("{}", now.as_secs_f64()))
}

/// Train until `config.trpo.max_timesteps`, then stop the plotter and close
/// the reacher.
pub fn run(config: &SessionConfig) -> Result<SessionOutcome> {
    config.validate()?;

    let tag = run_tag()?;
    let seeds = seed_everything::<TrainBackend>(config.seed);
    log::info!("run {} (seed {}, backend seed {})", tag, seeds.numeric, seeds.framework);
    let device = NdArrayDevice::default();

    let reacher = DxlReacher1D::new(config.reacher.clone(), &config.communicator_setup())
        .context("failed to create the reacher")?;
    let mut env = NormalizedEnv::new(reacher);
    env.start().context("failed to start the reacher")?;

    let record = training_record();
    let signal = RunSignal::new();
    let plotter = match spawn_plotter(
        &tag,
        env.live_view(),
        config.trpo.timesteps_per_batch,
        record.clone(),
        signal.clone(),
        config.plot.clone(),
    ) {
        Ok(plotter) => plotter,
        Err(e) => {
            if let Err(close_err) = env.close() {
                log::warn!("closing the reacher failed: {}", close_err);
            }
            return Err(e).context("failed to start the plotter");
        }
    };

    let trained = trpo::learn::<TrainBackend, _, _, _>(
        &mut env,
        &config.policy,
        &config.trpo,
        &device,
        |report: &BatchReport| record.append_batch(&report.episode_returns, &report.episode_lengths),
    );
    if let Err(e) = &trained {
        log::error!("training stopped: {}", e);
    }

    signal.request_stop();
    thread::sleep(config.grace_period);
    if !signal.try_acknowledged() {
        log::warn!(
            "plotter has not acknowledged the stop request after {:?}; joining anyway",
            config.grace_period
        );
    }
    let plotted = plotter.join();
    let closed = env.close();

    let summary = trained.context("training failed")?;
    let image_path = plotted.context("plotting failed")?;
    closed.context("failed to close the reacher")?;

    Ok(SessionOutcome {
        tag,
        image_path,
        summary,
    })
}
