//! Training dashboard.
//!
//! A plotting worker samples the reacher's live state and the shared training
//! record while training runs, and saves the smoothed learning curve when it
//! is stopped.
//!
//! # Features
//!
//! - `render`: plotters charts and PNG output
//! - `render-realtime`: live window via minifb
//!
//! # Example
//!
//! ```ignore
//! use dxl_reacher_env::renderer::{spawn_plotter, PlotConfig};
//!
//! let plotter = spawn_plotter(&tag, env.live_view(), batch_size, record.clone(), signal.clone(), PlotConfig::default())?;
//! // ... train ...
//! signal.request_stop();
//! let saved = plotter.join()?;
//! ```

// Chart-independent pieces, built without `render`
mod config;
mod error;
pub mod learning_curve;

pub use config::PlotConfig;
pub use error::{RenderError, RenderResult};
pub use learning_curve::{CurvePoint, LearningCurve};

#[cfg(feature = "render")]
pub mod backends;

#[cfg(feature = "render")]
mod plotter;

#[cfg(feature = "render")]
pub use plotter::{spawn_plotter, PlotterHandle};

// Live window
#[cfg(feature = "render-realtime")]
mod realtime;

#[cfg(feature = "render-realtime")]
pub use realtime::RealtimeWindow;
