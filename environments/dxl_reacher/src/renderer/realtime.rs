//! Live dashboard window using minifb.

use std::time::{Duration, Instant};

use minifb::{Key, ScaleMode, Window, WindowOptions};

use crate::live_state::LiveSample;
use crate::renderer::{backends::ImageBackend, LearningCurve, PlotConfig, RenderError, RenderResult};

/// Window showing the reacher state next to the learning curve.
pub struct RealtimeWindow {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    backend: ImageBackend,
    config: PlotConfig,
    last_update: Instant,
    frame_duration: Duration,
}

impl RealtimeWindow {
    /// Open a window sized and titled after `config`.
    pub fn new(config: &PlotConfig) -> RenderResult<Self> {
        let (w, h) = config.image_size;
        let (width, height) = (w as usize, h as usize);
        let options = WindowOptions {
            resize: true,
            scale_mode: ScaleMode::AspectRatioStretch,
            ..Default::default()
        };
        let window =
            Window::new(&config.title, width, height, options).map_err(|e| RenderError::WindowCreation(e.to_string()))?;

        Ok(Self {
            window,
            buffer: vec![0; width * height],
            width,
            height,
            backend: ImageBackend::new(w, h),
            config: config.clone(),
            last_update: Instant::now(),
            frame_duration: Duration::from_secs(1) / config.window_fps,
        })
    }

    /// False once the window was closed or Escape is held.
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// Redraw the dashboard, at most once per frame period.
    ///
    /// Returns `Ok(false)` once the window has been closed.
    pub fn update(&mut self, sample: &LiveSample, curve: Option<&LearningCurve>) -> RenderResult<bool> {
        if !self.is_open() {
            return Ok(false);
        }

        let now = Instant::now();
        if now.duration_since(self.last_update) < self.frame_duration {
            // Keep the event loop serviced between frames
            self.window.update();
            return Ok(true);
        }
        self.last_update = now;

        let (new_width, new_height) = self.window.get_size();
        if (new_width, new_height) != (self.width, self.height) && new_width > 0 && new_height > 0 {
            self.width = new_width;
            self.height = new_height;
            self.buffer.resize(new_width * new_height, 0);
            self.backend = ImageBackend::new(new_width as u32, new_height as u32);
        }

        let rgb = self.backend.render_dashboard(sample, curve, &self.config)?;
        self.rgb_to_argb(&rgb);

        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| RenderError::WindowCreation(e.to_string()))?;

        Ok(true)
    }

    /// Convert RGB buffer to ARGB buffer for minifb.
    fn rgb_to_argb(&mut self, rgb: &[u8]) {
        let pixels = self.width * self.height;
        for (dst, px) in self.buffer[..pixels].iter_mut().zip(rgb.chunks_exact(3)) {
            *dst = 0xFF000000 | (px[0] as u32) << 16 | (px[1] as u32) << 8 | px[2] as u32;
        }
    }

    /// Get window dimensions.
    pub fn size(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}
