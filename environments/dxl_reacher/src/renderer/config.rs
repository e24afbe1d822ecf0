//! Plotter configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{RenderError, RenderResult};

/// Configuration of the plotting worker and its charts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotConfig {
    /// Directory receiving `<tag>.png`.
    pub output_dir: PathBuf,
    /// Figure title.
    pub title: String,
    /// Dashboard size in pixels (width, height); each chart takes half the width.
    pub image_size: (u32, u32),
    /// Steps averaged behind each learning-curve sample.
    pub window_steps: u64,
    /// Steps between learning-curve samples.
    pub sample_stride: u64,
    /// Pause between loop iterations.
    pub refresh_interval: Duration,
    /// Pause before the first frame.
    pub startup_delay: Duration,
    /// Learning-curve y range padding as a fraction of the value span.
    pub y_padding: f64,
    /// Saved image size relative to the learning-curve panel.
    pub save_expand: f64,
    /// Open a live window (needs the `render-realtime` feature).
    pub show_window: bool,
    /// Window refresh rate cap.
    pub window_fps: u32,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            title: "DXL Reacher".to_string(),
            image_size: (2000, 600),
            window_steps: 5000,
            sample_stride: 1000,
            refresh_interval: Duration::from_millis(10),
            startup_delay: Duration::from_secs(5),
            y_padding: 0.05,
            save_expand: 1.1,
            show_window: true,
            window_fps: 30,
        }
    }
}

impl PlotConfig {
    /// Create a new config with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set output directory.
    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    /// Set dashboard size.
    pub fn with_image_size(mut self, width: u32, height: u32) -> Self {
        self.image_size = (width, height);
        self
    }

    /// Set the averaging window and sample stride of the learning curve.
    pub fn with_curve(mut self, window_steps: u64, sample_stride: u64) -> Self {
        self.window_steps = window_steps;
        self.sample_stride = sample_stride;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    pub fn with_startup_delay(mut self, delay: Duration) -> Self {
        self.startup_delay = delay;
        self
    }

    pub fn with_show_window(mut self, show: bool) -> Self {
        self.show_window = show;
        self
    }

    /// Size of the learning-curve panel alone.
    pub fn panel_size(&self) -> (u32, u32) {
        (self.image_size.0 / 2, self.image_size.1)
    }

    /// Size of the saved learning-curve image.
    pub fn saved_size(&self) -> (u32, u32) {
        let (w, h) = self.panel_size();
        (
            (w as f64 * self.save_expand).round() as u32,
            (h as f64 * self.save_expand).round() as u32,
        )
    }

    /// Validate the configuration.
    pub fn validate(&self) -> RenderResult<()> {
        let (w, h) = self.image_size;
        if w < 200 || h < 100 {
            return Err(RenderError::InvalidConfig(format!(
                "image size {}x{} is too small",
                w, h
            )));
        }
        if self.sample_stride == 0 {
            return Err(RenderError::InvalidConfig("sample_stride must be positive".to_string()));
        }
        if self.window_steps == 0 {
            return Err(RenderError::InvalidConfig("window_steps must be positive".to_string()));
        }
        if !(self.y_padding >= 0.0) || !(self.save_expand >= 1.0) {
            return Err(RenderError::InvalidConfig(
                "y_padding must be non-negative and save_expand at least 1".to_string(),
            ));
        }
        if self.window_fps == 0 {
            return Err(RenderError::InvalidConfig("window_fps must be positive".to_string()));
        }
        Ok(())
    }
}
