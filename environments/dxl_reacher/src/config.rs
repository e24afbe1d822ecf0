//! Reacher configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use dxl_reacher_env::{ReacherConfig, DxlSetup, ResetType};
//!
//! let config = ReacherConfig::new(DxlSetup::gripper_default())
//!     .with_dt(0.04)
//!     .with_episode_length_time(2.0)
//!     .with_max_torque_mag(100.0)
//!     .with_reset_type(ResetType::Zero);
//! config.validate()?;
//! ```

use std::f32::consts::FRAC_PI_3;

use serde::{Deserialize, Serialize};

use crate::error::{EnvError, EnvResult};

/// What the policy's action commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlType {
    /// Raw torque units in `[-max_torque_mag, max_torque_mag]`
    Torque,
    /// Goal velocity in `[-max_velocity, max_velocity]` rad/s
    Velocity,
}

/// How each episode's target is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TargetType {
    /// Uniform in the joint's angle range
    Position,
    /// The same angle every episode
    Fixed(f32),
}

/// Where the joint is driven before an episode starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetType {
    /// Back to angle 0
    Zero,
    /// A uniform angle inside the range
    Random,
}

/// Per-step reward shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardType {
    /// `-|target - position| * dt`
    Linear,
    /// `-(target - position)² * dt`
    Quadratic,
}

/// Hardware description of a servo arrangement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DxlSetup {
    pub name: String,
    /// Lowest reachable angle (rad)
    pub angle_low: f32,
    /// Highest reachable angle (rad)
    pub angle_high: f32,
    /// Goal velocity bound in velocity control (rad/s)
    pub max_velocity: f32,
    /// Proportional gain of the reset controller (torque units per rad)
    pub reset_kp: f32,
    /// Derivative gain of the reset controller (torque units per rad/s)
    pub reset_kd: f32,
    /// Reset is done once the joint is this close to its reset angle (rad)
    pub reset_tolerance: f32,
    /// Control periods the reset controller may take
    pub reset_max_steps: usize,
}

impl DxlSetup {
    /// Single gripper servo limited to ±60°.
    pub fn gripper_default() -> Self {
        Self {
            name: "dxl_gripper_default".to_string(),
            angle_low: -FRAC_PI_3,
            angle_high: FRAC_PI_3,
            max_velocity: 2.0,
            reset_kp: 300.0,
            reset_kd: 20.0,
            reset_tolerance: 0.02,
            reset_max_steps: 100,
        }
    }
}

/// Configuration of [`DxlReacher1D`](crate::DxlReacher1D).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReacherConfig {
    pub setup: DxlSetup,
    /// Communicator used for actuation.
    pub actuator_name: String,
    /// Communicator used for sensing.
    pub sensor_name: String,
    /// Sensor packets stacked into each observation.
    pub obs_history: usize,
    /// Control period (s).
    pub dt: f32,
    /// Episode length in steps; overrides `episode_length_time`.
    pub episode_length_step: Option<usize>,
    /// Episode length (s).
    pub episode_length_time: f32,
    /// Torque bound in raw units.
    pub max_torque_mag: f32,
    pub control_type: ControlType,
    pub target_type: TargetType,
    pub reset_type: ResetType,
    pub reward_type: RewardType,
    /// Seed of the target/reset generator.
    pub seed: u64,
    /// Poll sensors on a background thread and pace steps to `dt` in wall-clock
    /// time. When false the communicator is advanced in lockstep.
    pub realtime: bool,
}

impl ReacherConfig {
    pub fn new(setup: DxlSetup) -> Self {
        Self {
            setup,
            actuator_name: "DXL".to_string(),
            sensor_name: "DXL".to_string(),
            obs_history: 1,
            dt: 0.04,
            episode_length_step: None,
            episode_length_time: 2.0,
            max_torque_mag: 100.0,
            control_type: ControlType::Torque,
            target_type: TargetType::Position,
            reset_type: ResetType::Zero,
            reward_type: RewardType::Linear,
            seed: 1,
            realtime: true,
        }
    }

    /// Name both the actuator and the sensor communicator.
    pub fn with_communicator(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.actuator_name = name.clone();
        self.sensor_name = name;
        self
    }

    pub fn with_obs_history(mut self, obs_history: usize) -> Self {
        self.obs_history = obs_history;
        self
    }

    /// Set the control period in seconds.
    pub fn with_dt(mut self, dt: f32) -> Self {
        self.dt = dt;
        self
    }

    pub fn with_episode_length_step(mut self, steps: Option<usize>) -> Self {
        self.episode_length_step = steps;
        self
    }

    pub fn with_episode_length_time(mut self, seconds: f32) -> Self {
        self.episode_length_time = seconds;
        self
    }

    pub fn with_max_torque_mag(mut self, max_torque_mag: f32) -> Self {
        self.max_torque_mag = max_torque_mag;
        self
    }

    pub fn with_control_type(mut self, control_type: ControlType) -> Self {
        self.control_type = control_type;
        self
    }

    pub fn with_target_type(mut self, target_type: TargetType) -> Self {
        self.target_type = target_type;
        self
    }

    pub fn with_reset_type(mut self, reset_type: ResetType) -> Self {
        self.reset_type = reset_type;
        self
    }

    pub fn with_reward_type(mut self, reward_type: RewardType) -> Self {
        self.reward_type = reward_type;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }

    /// Steps per episode.
    pub fn episode_steps(&self) -> usize {
        self.episode_length_step
            .unwrap_or_else(|| (self.episode_length_time / self.dt).round() as usize)
    }

    /// Action bound in the units of the control type.
    pub fn action_limit(&self) -> f32 {
        match self.control_type {
            ControlType::Torque => self.max_torque_mag,
            ControlType::Velocity => self.setup.max_velocity,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> EnvResult<()> {
        let invalid = |msg: String| -> EnvResult<()> { Err(EnvError::InvalidConfig(msg)) };

        if !(self.dt > 0.0) {
            return invalid(format!("dt must be positive, got {}", self.dt));
        }
        if self.obs_history == 0 {
            return invalid("obs_history must be at least 1".to_string());
        }
        if self.episode_steps() == 0 {
            return invalid("episode must last at least one step".to_string());
        }
        if !(self.max_torque_mag > 0.0) {
            return invalid(format!("max_torque_mag must be positive, got {}", self.max_torque_mag));
        }
        if !(self.setup.angle_low < self.setup.angle_high) {
            return invalid(format!(
                "angle_low ({}) must be below angle_high ({})",
                self.setup.angle_low, self.setup.angle_high
            ));
        }
        if self.actuator_name != self.sensor_name {
            return invalid(format!(
                "actuator '{}' and sensor '{}' must share one communicator",
                self.actuator_name, self.sensor_name
            ));
        }
        if let TargetType::Fixed(angle) = self.target_type {
            if angle < self.setup.angle_low || angle > self.setup.angle_high {
                return invalid(format!("fixed target {} outside the joint range", angle));
            }
        }
        Ok(())
    }
}

impl Default for ReacherConfig {
    fn default() -> Self {
        Self::new(DxlSetup::gripper_default())
    }
}
