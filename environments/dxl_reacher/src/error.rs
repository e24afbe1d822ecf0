//! Environment error types.

use std::fmt;
use std::io;

use crate::communicator::CommError;

/// Errors raised while building or driving the reacher.
#[derive(Debug)]
pub enum EnvError {
    /// Invalid configuration value
    InvalidConfig(String),
    /// `reset`/`step` called before `start`
    NotStarted,
    /// `start` called twice
    AlreadyStarted,
    /// A serial device was requested but no hardware driver is compiled in
    DriverUnavailable { device_path: String },
    /// Sensor read or actuator write failed
    Communication(CommError),
    /// Action has the wrong number of components
    ActionDimensionMismatch { expected: usize, actual: usize },
    /// The sensor poller thread panicked
    PollerPanicked,
    /// Spawning the sensor poller failed
    Io(io::Error),
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            EnvError::NotStarted => write!(f, "Environment has not been started"),
            EnvError::AlreadyStarted => write!(f, "Environment is already running"),
            EnvError::DriverUnavailable { device_path } => write!(
                f,
                "No hardware driver available for device {}; omit the port to use the simulated actuator",
                device_path
            ),
            EnvError::Communication(e) => write!(f, "Communication error: {}", e),
            EnvError::ActionDimensionMismatch { expected, actual } => write!(
                f,
                "Action dimension mismatch: expected {}, got {}",
                expected, actual
            ),
            EnvError::PollerPanicked => write!(f, "Sensor poller thread panicked"),
            EnvError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for EnvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EnvError::Communication(e) => Some(e),
            EnvError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CommError> for EnvError {
    fn from(err: CommError) -> Self {
        EnvError::Communication(err)
    }
}

impl From<io::Error> for EnvError {
    fn from(err: io::Error) -> Self {
        EnvError::Io(err)
    }
}

/// Result type alias for environment operations.
pub type EnvResult<T> = Result<T, EnvError>;
