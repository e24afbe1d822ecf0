//! DXL Reacher TRPO Trainer
//!
//! Trains a Gaussian MLP policy with TRPO on the one degree-of-freedom
//! Dynamixel reacher. A plotting thread shows the joint and the learning curve
//! while training runs and saves `<timestamp>.png` when it ends.
//!
//! ```bash
//! # Simulated servo
//! cargo run --release
//!
//! # Servo 1 on a serial bus
//! cargo run --release -- --port /dev/ttyUSB0 --id 1 --baud 1000000
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

mod cli;
mod session;

use anyhow::Result;
use clap::Parser;

use crate::cli::Args;
use crate::session::SessionConfig;

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = SessionConfig::from_args(&args);
    log::debug!("session config: {:?}", config);

    let outcome = session::run(&config)?;
    log::info!(
        "Finished run {}: {} iterations, {} timesteps, {} episodes; learning curve at {}",
        outcome.tag,
        outcome.summary.iterations,
        outcome.summary.timesteps,
        outcome.summary.episodes,
        outcome.image_path.display()
    );
    Ok(())
}
