//! Training progress logging.
//!
//! - [`IterationSnapshot`]: statistics of one TRPO iteration
//! - [`EpisodeWindow`]: rolling mean over recent episodes
//! - [`ConsoleLogger`]: table output through the `log` facade

pub mod logger;

pub use logger::{ConsoleLogger, EpisodeWindow, IterationSnapshot, MetricsLogger};
