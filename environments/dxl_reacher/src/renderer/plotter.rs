//! Background plotting worker.
//!
//! ```text
//! Trainer Thread                  Plotter Thread
//! ┌──────────────────┐            ┌────────────────────────────────┐
//! │ learn()          │            │ sleep(startup_delay)           │
//! │   callback ──────┼─ record ──→│ while signal.is_running():     │
//! │ env.step() ──────┼─ live ────→│   sample, recompute, redraw    │
//! │                  │            │   sleep(refresh_interval)      │
//! │ request_stop() ──┼─ signal ──→│ acknowledge()                  │
//! │ join() ←─────────┼────────────│ save <output_dir>/<tag>.png    │
//! └──────────────────┘            └────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use trust_region_rl::{RunSignal, SharedTrainingRecord};

use crate::live_state::{LiveSample, LiveView};
use crate::renderer::backends::ImageBackend;
use crate::renderer::{LearningCurve, PlotConfig, RenderError, RenderResult};

#[cfg(feature = "render-realtime")]
use crate::renderer::RealtimeWindow;

/// Handle to a running plotter thread.
pub struct PlotterHandle {
    output_path: PathBuf,
    thread: JoinHandle<RenderResult<PathBuf>>,
}

impl PlotterHandle {
    /// Where the learning curve will be written.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the worker and return the path of the saved image.
    pub fn join(self) -> RenderResult<PathBuf> {
        self.thread.join().map_err(|_| RenderError::PlotterPanicked)?
    }
}

/// Start the plotting worker.
///
/// The worker runs until `signal` is stopped, acknowledges, and then saves
/// the learning curve as `<config.output_dir>/<tag>.png`. `batch_size` places
/// episodes on the step axis when the record carries no lengths.
pub fn spawn_plotter(
    tag: &str,
    view: LiveView,
    batch_size: usize,
    record: SharedTrainingRecord,
    signal: RunSignal,
    config: PlotConfig,
) -> RenderResult<PlotterHandle> {
    config.validate()?;
    let output_path = config.output_dir.join(format!("{}.png", tag));

    let worker = Plotter {
        view,
        batch_size: batch_size as u64,
        record,
        signal,
        output_path: output_path.clone(),
        config,
    };
    let thread = thread::Builder::new()
        .name("dxl-plotter".to_string())
        .spawn(move || worker.run())?;

    Ok(PlotterHandle { output_path, thread })
}

struct Plotter {
    view: LiveView,
    batch_size: u64,
    record: SharedTrainingRecord,
    signal: RunSignal,
    output_path: PathBuf,
    config: PlotConfig,
}

impl Plotter {
    fn run(self) -> RenderResult<PathBuf> {
        log::info!("Started plotting routine");
        thread::sleep(self.config.startup_delay);

        let mut display = LiveDisplay::open(&self.config);
        let mut curve: Option<LearningCurve> = None;
        let mut seen = self.record.episode_count();

        while self.signal.is_running() {
            let sample = self.view.sample();

            let count = self.record.episode_count();
            if count > seen {
                let snapshot = self.record.snapshot();
                seen = snapshot.len();
                curve = LearningCurve::compute(&snapshot, self.batch_size, &self.config);
            }

            thread::sleep(self.config.refresh_interval);
            display.refresh(&sample, curve.as_ref());
        }

        self.signal.acknowledge();
        log::debug!("plotter observed stop request");

        let snapshot = self.record.snapshot();
        let curve = LearningCurve::compute(&snapshot, self.batch_size, &self.config);
        if curve.is_none() {
            log::warn!(
                "{} episodes recorded, too few for a learning curve; saving empty axes",
                snapshot.len()
            );
        }

        if let Some(dir) = self.output_path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let (width, height) = self.config.saved_size();
        ImageBackend::new(width, height).save_learning_curve(curve.as_ref(), &self.config, &self.output_path)?;
        log::info!("Saved learning curve to {}", self.output_path.display());

        Ok(self.output_path)
    }
}

/// Optional live window; headless when unavailable.
struct LiveDisplay {
    #[cfg(feature = "render-realtime")]
    window: Option<RealtimeWindow>,
}

impl LiveDisplay {
    #[cfg(feature = "render-realtime")]
    fn open(config: &PlotConfig) -> Self {
        if !config.show_window {
            return Self { window: None };
        }
        match RealtimeWindow::new(config) {
            Ok(window) => Self { window: Some(window) },
            Err(e) => {
                log::warn!("{}; plotting headless", e);
                Self { window: None }
            }
        }
    }

    #[cfg(not(feature = "render-realtime"))]
    fn open(config: &PlotConfig) -> Self {
        if config.show_window {
            log::info!("built without the render-realtime feature; plotting headless");
        }
        Self {}
    }

    #[cfg(feature = "render-realtime")]
    fn refresh(&mut self, sample: &LiveSample, curve: Option<&LearningCurve>) {
        let Some(window) = self.window.as_mut() else {
            return;
        };
        match window.update(sample, curve) {
            Ok(true) => {}
            Ok(false) => {
                log::info!("plot window closed; plotting continues headless");
                self.window = None;
            }
            Err(e) => {
                log::warn!("plot window failed: {}; plotting continues headless", e);
                self.window = None;
            }
        }
    }

    #[cfg(not(feature = "render-realtime"))]
    fn refresh(&mut self, _sample: &LiveSample, _curve: Option<&LearningCurve>) {}
}
