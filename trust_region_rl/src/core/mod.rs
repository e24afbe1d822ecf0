//! Core data structures shared between the trainer and observer threads.

pub mod record;
pub mod run_signal;
pub mod running_stats;

pub use record::{training_record, SharedTrainingRecord, TrainingRecord};
pub use run_signal::RunSignal;
pub use running_stats::RunningMeanStd;
