//! Simulated Dynamixel servo.
//!
//! Single rotor with viscous friction:
//!
//! ```text
//! J ω' = τ − b ω,    θ' = ω
//! ```
//!
//! integrated with semi-implicit Euler in `SUBSTEPS` slices per sensor period.
//! The joint stops hard at its angle limits.

use std::f32::consts::FRAC_PI_3;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};

use super::{ActuatorCommand, CommError, Communicator, SensorPacket};
use crate::error::{EnvError, EnvResult};

const SUBSTEPS: usize = 10;

/// Physical parameters of the simulated servo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedDxlConfig {
    /// Rotor inertia (kg·m²)
    pub inertia: f32,
    /// Viscous friction (N·m·s/rad)
    pub damping: f32,
    /// Output torque per raw torque unit (N·m)
    pub torque_per_unit: f32,
    /// Proportional gain of the velocity mode (N·m·s/rad)
    pub velocity_gain: f32,
    /// Torque saturation (N·m)
    pub stall_torque: f32,
    /// Half-width of uniform noise added to position readings (rad)
    pub position_noise: f32,
    /// Lower hard stop (rad)
    pub angle_low: f32,
    /// Upper hard stop (rad)
    pub angle_high: f32,
}

impl Default for SimulatedDxlConfig {
    fn default() -> Self {
        Self {
            inertia: 0.005,
            damping: 0.02,
            torque_per_unit: 0.0015,
            velocity_gain: 0.05,
            stall_torque: 1.5,
            position_noise: 0.0,
            angle_low: -FRAC_PI_3,
            angle_high: FRAC_PI_3,
        }
    }
}

impl SimulatedDxlConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hard stops.
    pub fn with_limits(mut self, angle_low: f32, angle_high: f32) -> Self {
        self.angle_low = angle_low;
        self.angle_high = angle_high;
        self
    }

    pub fn with_position_noise(mut self, noise: f32) -> Self {
        self.position_noise = noise;
        self
    }

    pub fn validate(&self) -> EnvResult<()> {
        if !(self.inertia > 0.0) {
            return Err(EnvError::InvalidConfig("inertia must be positive".to_string()));
        }
        if self.damping < 0.0 || self.position_noise < 0.0 || !(self.stall_torque > 0.0) {
            return Err(EnvError::InvalidConfig(
                "damping and noise must be non-negative, stall torque positive".to_string(),
            ));
        }
        if !(self.angle_low < self.angle_high) {
            return Err(EnvError::InvalidConfig(format!(
                "angle_low ({}) must be below angle_high ({})",
                self.angle_low, self.angle_high
            )));
        }
        Ok(())
    }
}

/// In-process servo model behind the [`Communicator`] interface.
pub struct SimulatedDxl {
    config: SimulatedDxlConfig,
    sensor_dt: f32,
    position: f32,
    velocity: f32,
    time: f64,
    command: ActuatorCommand,
    rng: Xoshiro256StarStar,
    closed: bool,
}

impl SimulatedDxl {
    /// Create a servo at rest at angle 0 (or the nearest limit).
    pub fn new(config: SimulatedDxlConfig, sensor_dt: f32, seed: u64) -> EnvResult<Self> {
        config.validate()?;
        if !(sensor_dt > 0.0) {
            return Err(EnvError::InvalidConfig("sensor_dt must be positive".to_string()));
        }
        let position = 0.0f32.clamp(config.angle_low, config.angle_high);
        Ok(Self {
            config,
            sensor_dt,
            position,
            velocity: 0.0,
            time: 0.0,
            command: ActuatorCommand::Torque(0.0),
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            closed: false,
        })
    }

    /// True joint angle, without sensor noise.
    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    fn torque(&self) -> f32 {
        let c = &self.config;
        let tau = match self.command {
            ActuatorCommand::Torque(units) => units * c.torque_per_unit,
            ActuatorCommand::Velocity(goal) => c.velocity_gain * (goal - self.velocity),
        };
        tau.clamp(-c.stall_torque, c.stall_torque)
    }

    /// Advance the model by one sensor period.
    fn integrate(&mut self) {
        let h = self.sensor_dt / SUBSTEPS as f32;
        let tau = self.torque();
        for _ in 0..SUBSTEPS {
            let accel = (tau - self.config.damping * self.velocity) / self.config.inertia;
            self.velocity += accel * h;
            self.position += self.velocity * h;

            if self.position <= self.config.angle_low {
                self.position = self.config.angle_low;
                self.velocity = self.velocity.max(0.0);
            } else if self.position >= self.config.angle_high {
                self.position = self.config.angle_high;
                self.velocity = self.velocity.min(0.0);
            }
        }
        self.time += self.sensor_dt as f64;
    }
}

impl Communicator for SimulatedDxl {
    fn read_sensor(&mut self) -> Result<SensorPacket, CommError> {
        if self.closed {
            return Err(CommError::Disconnected);
        }
        self.integrate();
        let noise = self.config.position_noise;
        let reading = if noise > 0.0 {
            self.position + self.rng.gen_range(-noise..noise)
        } else {
            self.position
        };
        Ok(SensorPacket {
            position: reading,
            velocity: self.velocity,
            timestamp: self.time,
        })
    }

    fn write_actuator(&mut self, command: ActuatorCommand) -> Result<(), CommError> {
        if self.closed {
            return Err(CommError::Disconnected);
        }
        let value = match command {
            ActuatorCommand::Torque(v) | ActuatorCommand::Velocity(v) => v,
        };
        if !value.is_finite() {
            return Err(CommError::InvalidCommand(format!("{:?}", command)));
        }
        self.command = command;
        Ok(())
    }

    fn sensor_dt(&self) -> f32 {
        self.sensor_dt
    }

    fn close(&mut self) {
        self.command = ActuatorCommand::Torque(0.0);
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn servo() -> SimulatedDxl {
        SimulatedDxl::new(SimulatedDxlConfig::default(), 0.01, 1).unwrap()
    }

    #[test]
    fn should_stay_at_rest_without_torque() {
        let mut dxl = servo();
        for _ in 0..50 {
            let packet = dxl.read_sensor().unwrap();
            assert_eq!(packet.position, 0.0);
            assert_eq!(packet.velocity, 0.0);
        }
    }

    #[test]
    fn should_turn_in_torque_direction() {
        let mut dxl = servo();
        dxl.write_actuator(ActuatorCommand::Torque(50.0)).unwrap();
        let packet = (0..10).map(|_| dxl.read_sensor().unwrap()).last().unwrap();
        assert!(packet.position > 0.0);
        assert!(packet.velocity > 0.0);
        assert!((packet.timestamp - 0.1).abs() < 1e-6);
    }

    #[test]
    fn should_stop_at_hard_limits() {
        let mut dxl = servo();
        dxl.write_actuator(ActuatorCommand::Torque(-100.0)).unwrap();
        for _ in 0..500 {
            dxl.read_sensor().unwrap();
        }
        assert_eq!(dxl.position(), -FRAC_PI_3);
        assert_eq!(dxl.velocity(), 0.0);
    }

    #[test]
    fn should_track_goal_velocity() {
        let mut dxl = servo();
        dxl.write_actuator(ActuatorCommand::Velocity(1.0)).unwrap();
        for _ in 0..50 {
            dxl.read_sensor().unwrap();
        }
        // Steady state of gain/(gain + damping)
        let expected = 0.05 / (0.05 + 0.02);
        assert!((dxl.velocity() - expected).abs() < 0.05, "velocity {}", dxl.velocity());
    }

    #[test]
    fn should_fail_after_close() {
        let mut dxl = servo();
        dxl.close();
        assert_eq!(dxl.read_sensor(), Err(CommError::Disconnected));
        assert!(dxl.write_actuator(ActuatorCommand::Torque(1.0)).is_err());
    }

    #[test]
    fn should_reject_non_finite_commands() {
        let mut dxl = servo();
        assert!(matches!(
            dxl.write_actuator(ActuatorCommand::Torque(f32::NAN)),
            Err(CommError::InvalidCommand(_))
        ));
    }

    #[test]
    fn should_add_bounded_noise_to_position_readings() {
        let config = SimulatedDxlConfig::default().with_position_noise(0.01);
        let mut dxl = SimulatedDxl::new(config, 0.01, 3).unwrap();
        let readings: Vec<f32> = (0..50).map(|_| dxl.read_sensor().unwrap().position).collect();

        // The joint stays at rest; only the reading moves
        assert_eq!(dxl.position(), 0.0);
        assert!(readings.iter().all(|r| r.abs() <= 0.01));
        assert!(readings.iter().any(|&r| r != 0.0));
        assert!(SimulatedDxlConfig::default().with_position_noise(-0.1).validate().is_err());
    }

    #[test]
    fn should_reject_inverted_limits() {
        let config = SimulatedDxlConfig::default().with_limits(1.0, -1.0);
        assert!(SimulatedDxl::new(config, 0.01, 1).is_err());
    }
}
