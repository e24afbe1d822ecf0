//! Error types for the training routine.

use std::error::Error;
use std::fmt;

/// Errors that can occur while configuring or running TRPO.
#[derive(Debug)]
pub enum TrpoError {
    /// A hyperparameter failed validation
    InvalidConfig {
        param: &'static str,
        message: String,
    },
    /// The environment (or its device) reported an error
    Environment(Box<dyn Error + Send + Sync>),
    /// Tensor data could not be read back from the backend
    Tensor(String),
    /// Observation or action had an unexpected length
    DimensionMismatch { expected: usize, actual: usize },
}

impl TrpoError {
    /// Wrap an environment error.
    pub fn environment<E: Error + Send + Sync + 'static>(err: E) -> Self {
        TrpoError::Environment(Box::new(err))
    }
}

impl fmt::Display for TrpoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrpoError::InvalidConfig { param, message } => {
                write!(f, "Invalid configuration for '{}': {}", param, message)
            }
            TrpoError::Environment(e) => write!(f, "Environment error: {}", e),
            TrpoError::Tensor(msg) => write!(f, "Tensor data error: {}", msg),
            TrpoError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
        }
    }
}

impl Error for TrpoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TrpoError::Environment(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Result type alias for training operations.
pub type TrpoResult<T> = Result<T, TrpoError>;
