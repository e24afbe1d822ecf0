//! Bitmap rendering backend using plotters.
//!
//! Charts are drawn into RGB byte buffers; the live window displays them and
//! the final learning curve is encoded to PNG through the `image` crate.
//!
//! Machines without a usable system font cannot draw text. The backend then
//! falls back to unlabeled charts for the rest of its lifetime.

use std::cell::Cell;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::live_state::LiveSample;
use crate::renderer::{LearningCurve, PlotConfig, RenderError, RenderResult};

const CURVE_COLOR: RGBColor = RGBColor(31, 119, 180);
const TARGET_COLOR: RGBColor = RGBColor(214, 39, 40);
const POSITION_COLOR: RGBColor = RGBColor(31, 119, 180);
const MARKER_SIZE: i32 = 10;

/// Image backend for RGB buffers and PNG output.
pub struct ImageBackend {
    width: u32,
    height: u32,
    labels: Cell<bool>,
}

impl ImageBackend {
    /// Create a new image backend with the specified dimensions.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            labels: Cell::new(true),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Render the two-panel dashboard: reacher state and learning curve.
    pub fn render_dashboard(
        &self,
        sample: &LiveSample,
        curve: Option<&LearningCurve>,
        config: &PlotConfig,
    ) -> RenderResult<Vec<u8>> {
        self.render_with_fallback(|root, labels| {
            let body = if labels {
                root.titled(&config.title, ("sans-serif", 28))
                    .map_err(RenderError::drawing)?
            } else {
                root.clone()
            };
            let panels = body.split_evenly((1, 2));
            draw_reacher(&panels[0], sample, labels)?;
            draw_learning_curve(&panels[1], curve, config, labels)
        })
    }

    /// Render the learning-curve panel alone, centred with a margin.
    ///
    /// The backend size is the expanded size; the panel keeps
    /// [`PlotConfig::panel_size`].
    pub fn render_learning_curve(
        &self,
        curve: Option<&LearningCurve>,
        config: &PlotConfig,
    ) -> RenderResult<Vec<u8>> {
        let (panel_w, panel_h) = config.panel_size();
        let margin_x = (self.width.saturating_sub(panel_w) / 2) as i32;
        let margin_y = (self.height.saturating_sub(panel_h) / 2) as i32;

        self.render_with_fallback(|root, labels| {
            let panel = root.margin(margin_y, margin_y, margin_x, margin_x);
            draw_learning_curve(&panel, curve, config, labels)
        })
    }

    /// Render the learning-curve panel and write it as PNG.
    pub fn save_learning_curve(
        &self,
        curve: Option<&LearningCurve>,
        config: &PlotConfig,
        path: impl AsRef<Path>,
    ) -> RenderResult<()> {
        let rgb = self.render_learning_curve(curve, config)?;
        save_png(rgb, self.width, self.height, path)
    }

    fn render_with_fallback<F>(&self, draw: F) -> RenderResult<Vec<u8>>
    where
        F: Fn(&DrawingArea<BitMapBackend<'_>, Shift>, bool) -> RenderResult<()>,
    {
        if self.labels.get() {
            match self.render_once(&draw, true) {
                Err(RenderError::Font(msg)) => {
                    log::warn!("no usable font, drawing charts without labels: {}", msg);
                    self.labels.set(false);
                }
                other => return other,
            }
        }
        self.render_once(&draw, false)
    }

    fn render_once<F>(&self, draw: &F, labels: bool) -> RenderResult<Vec<u8>>
    where
        F: Fn(&DrawingArea<BitMapBackend<'_>, Shift>, bool) -> RenderResult<()>,
    {
        let mut buffer = vec![0u8; (self.width * self.height * 3) as usize];

        {
            let root = BitMapBackend::with_buffer(&mut buffer, (self.width, self.height))
                .into_drawing_area();

            root.fill(&WHITE).map_err(RenderError::drawing)?;
            draw(&root, labels)?;
            root.present().map_err(RenderError::drawing)?;
        }

        Ok(buffer)
    }
}

/// Encode an RGB buffer as PNG.
pub fn save_png(rgb: Vec<u8>, width: u32, height: u32, path: impl AsRef<Path>) -> RenderResult<()> {
    let image = image::RgbImage::from_raw(width, height, rgb).ok_or_else(|| {
        RenderError::ImageEncoding(format!("buffer does not hold a {}x{} RGB image", width, height))
    })?;
    image.save(path.as_ref())?;
    Ok(())
}

/// Current and target angle as two markers.
///
/// Both axes are inverted: values are plotted negated and labelled with
/// their true sign.
fn draw_reacher<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    sample: &LiveSample,
    labels: bool,
) -> RenderResult<()>
where
    DB::ErrorType: 'static,
{
    let x_range = -(sample.angle_high as f64)..-(sample.angle_low as f64);
    let y_range = -2.0f64..0.0f64;

    let mut builder = ChartBuilder::on(area);
    builder.margin(10);
    if labels {
        builder
            .caption(format!("Current Reward: {}", sample.reward), ("sans-serif", 18))
            .x_label_area_size(40)
            .y_label_area_size(50);
    }
    let mut chart = builder
        .build_cartesian_2d(x_range, y_range)
        .map_err(RenderError::drawing)?;

    if labels {
        chart
            .configure_mesh()
            .x_desc("X")
            .y_desc("Y")
            .x_label_formatter(&|v: &f64| format!("{:.2}", -v))
            .y_label_formatter(&|v: &f64| format!("{:.1}", -v))
            .draw()
            .map_err(RenderError::drawing)?;
    }

    chart
        .draw_series(std::iter::once(Circle::new(
            (-(sample.target as f64), -1.0),
            MARKER_SIZE,
            TARGET_COLOR.filled(),
        )))
        .map_err(RenderError::drawing)?;
    chart
        .draw_series(std::iter::once(Circle::new(
            (-(sample.position as f64), -1.0),
            MARKER_SIZE,
            POSITION_COLOR.filled(),
        )))
        .map_err(RenderError::drawing)?;

    Ok(())
}

/// Average return against time step.
fn draw_learning_curve<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    curve: Option<&LearningCurve>,
    config: &PlotConfig,
    labels: bool,
) -> RenderResult<()>
where
    DB::ErrorType: 'static,
{
    let stride = config.sample_stride as f64;
    let ((x_min, x_max), (y_min, y_max)) = match curve {
        Some(curve) => (curve.x_range(), curve.y_range(config.y_padding)),
        None => ((stride, 2.0 * stride), (0.0, 1.0)),
    };

    let mut builder = ChartBuilder::on(area);
    builder.margin(10);
    if labels {
        builder
            .caption("Learning Curve", ("sans-serif", 18))
            .x_label_area_size(40)
            .y_label_area_size(60);
    }
    let mut chart = builder
        .build_cartesian_2d(x_min..x_max, y_min..y_max)
        .map_err(RenderError::drawing)?;

    if labels {
        chart
            .configure_mesh()
            .x_desc("Time Step")
            .y_desc("Average Returns")
            .draw()
            .map_err(RenderError::drawing)?;
    }

    if let Some(curve) = curve {
        chart
            .draw_series(LineSeries::new(curve.series(), CURVE_COLOR.stroke_width(2)))
            .map_err(RenderError::drawing)?;
    }

    Ok(())
}
