//! Actuator communication.
//!
//! A [`Communicator`] is the device boundary of the reacher: it reads one
//! sensor packet per sensor period and accepts actuator commands. The
//! environment never talks to a device any other way.
//!
//! Only the simulated actuator ([`SimulatedDxl`]) is compiled into this crate.
//! A setup that names a serial device is rejected at build time with
//! [`EnvError::DriverUnavailable`].

mod simulated;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EnvError, EnvResult};

pub use simulated::{SimulatedDxl, SimulatedDxlConfig};

/// One reading of the actuator's sensors.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorPacket {
    /// Present joint angle (rad)
    pub position: f32,
    /// Present joint velocity (rad/s)
    pub velocity: f32,
    /// Device time of the reading (s)
    pub timestamp: f64,
}

/// Command written to the actuator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActuatorCommand {
    /// Raw torque units, as accepted by the servo's current/torque register
    Torque(f32),
    /// Goal velocity (rad/s)
    Velocity(f32),
}

/// Device-level communication failure.
#[derive(Debug, Clone, PartialEq)]
pub enum CommError {
    /// The device was closed or disconnected
    Disconnected,
    /// The command is not accepted by the device
    InvalidCommand(String),
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommError::Disconnected => write!(f, "device disconnected"),
            CommError::InvalidCommand(msg) => write!(f, "invalid command: {}", msg),
        }
    }
}

impl std::error::Error for CommError {}

/// Sensor/actuator link to one servo.
pub trait Communicator: Send {
    /// Read the next sensor packet. Each call covers one sensor period.
    fn read_sensor(&mut self) -> Result<SensorPacket, CommError>;

    /// Write an actuator command; it stays in effect until the next write.
    fn write_actuator(&mut self, command: ActuatorCommand) -> Result<(), CommError>;

    /// Sensor period (s).
    fn sensor_dt(&self) -> f32;

    /// Release the device. Further reads and writes fail.
    fn close(&mut self) {}
}

/// Connection parameters of a Dynamixel servo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DxlCommunicatorConfig {
    /// Servo id on the bus.
    pub idn: i32,
    /// Bus baud rate.
    pub baudrate: u32,
    /// Sensor period (s).
    pub sensor_dt: f32,
    /// Serial device; `None` selects the simulated actuator.
    pub device_path: Option<String>,
    /// Use the native driver bindings instead of the protocol SDK.
    pub use_ctypes_driver: bool,
}

impl Default for DxlCommunicatorConfig {
    fn default() -> Self {
        Self {
            idn: 1,
            baudrate: 1_000_000,
            sensor_dt: 0.01,
            device_path: None,
            use_ctypes_driver: true,
        }
    }
}

impl DxlCommunicatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_idn(mut self, idn: i32) -> Self {
        self.idn = idn;
        self
    }

    pub fn with_baudrate(mut self, baudrate: u32) -> Self {
        self.baudrate = baudrate;
        self
    }

    /// Set the sensor period in seconds.
    pub fn with_sensor_dt(mut self, sensor_dt: f32) -> Self {
        self.sensor_dt = sensor_dt;
        self
    }

    pub fn with_device_path(mut self, device_path: Option<String>) -> Self {
        self.device_path = device_path;
        self
    }

    pub fn with_ctypes_driver(mut self, enabled: bool) -> Self {
        self.use_ctypes_driver = enabled;
        self
    }

    /// Validate the connection parameters.
    pub fn validate(&self) -> EnvResult<()> {
        if !(self.sensor_dt > 0.0) {
            return Err(EnvError::InvalidConfig(format!(
                "sensor_dt must be positive, got {}",
                self.sensor_dt
            )));
        }
        if self.baudrate == 0 {
            return Err(EnvError::InvalidConfig("baudrate must be positive".to_string()));
        }
        Ok(())
    }
}

/// Named communicator bundle handed to the environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommunicatorSetup {
    /// Name the environment uses to address this communicator.
    pub name: String,
    /// Sensor packets kept per observation.
    pub num_sensor_packets: usize,
    /// Connection parameters.
    pub dxl: DxlCommunicatorConfig,
    /// Model used when no device is attached.
    pub simulation: SimulatedDxlConfig,
}

impl CommunicatorSetup {
    pub fn new(name: impl Into<String>, num_sensor_packets: usize, dxl: DxlCommunicatorConfig) -> Self {
        Self {
            name: name.into(),
            num_sensor_packets,
            dxl,
            simulation: SimulatedDxlConfig::default(),
        }
    }

    /// Replace the simulated actuator model.
    pub fn with_simulation(mut self, simulation: SimulatedDxlConfig) -> Self {
        self.simulation = simulation;
        self
    }

    /// Open the communicator for a joint limited to `[angle_low, angle_high]`.
    pub fn build(&self, angle_low: f32, angle_high: f32, seed: u64) -> EnvResult<Box<dyn Communicator>> {
        self.dxl.validate()?;
        if self.num_sensor_packets == 0 {
            return Err(EnvError::InvalidConfig(
                "num_sensor_packets must be at least 1".to_string(),
            ));
        }

        if let Some(device_path) = &self.dxl.device_path {
            return Err(EnvError::DriverUnavailable {
                device_path: device_path.clone(),
            });
        }

        log::info!(
            "communicator '{}': simulated servo id {} at {} baud, sensor_dt {}s",
            self.name,
            self.dxl.idn,
            self.dxl.baudrate,
            self.dxl.sensor_dt
        );
        let simulation = self.simulation.clone().with_limits(angle_low, angle_high);
        Ok(Box::new(SimulatedDxl::new(simulation, self.dxl.sensor_dt, seed)?))
    }
}
