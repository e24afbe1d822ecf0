//! Dynamixel Reacher Environment
//!
//! A one degree-of-freedom reaching task on a Dynamixel servo, together with
//! the live dashboard used while training on it.
//!
//! # Features
//!
//! - **Reacher task**: random target angle per episode, torque or velocity
//!   control, distance-based reward, fixed-length episodes
//! - **Simulated servo**: a damped rotor with hard stops stands in for the
//!   hardware driver, advanced either in wall-clock time or in lockstep
//! - **Action normalization**: policies act in `[-1, 1]`
//! - **Dashboard**: live position/target markers and a smoothed learning curve,
//!   saved as PNG when training stops (`render` feature)
//!
//! # Example
//!
//! ```rust,ignore
//! use dxl_reacher_env::{
//!     CommunicatorSetup, DxlCommunicatorConfig, DxlReacher1D, DxlSetup, EnvLifecycle,
//!     NormalizedEnv, ReacherConfig,
//! };
//!
//! let config = ReacherConfig::new(DxlSetup::gripper_default());
//! let setup = CommunicatorSetup::new("DXL", 1, DxlCommunicatorConfig::new().with_idn(1));
//!
//! let mut env = NormalizedEnv::new(DxlReacher1D::new(config, &setup)?);
//! env.start()?;
//! let view = env.live_view();
//! // ... train on `env`, plot from `view` ...
//! env.close()?;
//! ```

pub mod communicator;
pub mod config;
pub mod env;
pub mod error;
pub mod live_state;
pub mod normalized;
pub mod renderer;
pub mod reward;

#[cfg(test)]
pub mod tests;

pub use communicator::{
    ActuatorCommand, CommError, Communicator, CommunicatorSetup, DxlCommunicatorConfig,
    SensorPacket, SimulatedDxl, SimulatedDxlConfig,
};
pub use config::{ControlType, DxlSetup, ReacherConfig, ResetType, RewardType, TargetType};
pub use env::{DxlReacher1D, EnvLifecycle};
pub use error::{EnvError, EnvResult};
pub use live_state::{LiveSample, LiveState, LiveView};
pub use normalized::NormalizedEnv;
pub use reward::compute_reward;
