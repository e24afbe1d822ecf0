//! Lock-free view of the reacher's live scalars.
//!
//! The environment publishes the present position, the episode target and the
//! last reward after every step. Readers on other threads (the plotter) sample
//! them without blocking the control loop. Each scalar is stored as `f32` bits
//! in an `AtomicU32`; the three values are not read as one consistent unit.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Values written by the environment.
#[derive(Debug)]
pub struct LiveState {
    position: AtomicF32,
    target: AtomicF32,
    reward: AtomicF32,
    angle_low: f32,
    angle_high: f32,
}

impl LiveState {
    pub fn new(angle_low: f32, angle_high: f32) -> Self {
        Self {
            position: AtomicF32::new(0.0),
            target: AtomicF32::new(0.0),
            reward: AtomicF32::new(0.0),
            angle_low,
            angle_high,
        }
    }

    pub fn set_position(&self, position: f32) {
        self.position.store(position);
    }

    pub fn set_target(&self, target: f32) {
        self.target.store(target);
    }

    pub fn set_reward(&self, reward: f32) {
        self.reward.store(reward);
    }
}

/// One reading of the live scalars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiveSample {
    pub position: f32,
    pub target: f32,
    pub reward: f32,
    pub angle_low: f32,
    pub angle_high: f32,
}

/// Cloneable read handle onto a [`LiveState`].
#[derive(Debug, Clone)]
pub struct LiveView {
    state: Arc<LiveState>,
}

impl LiveView {
    pub(crate) fn new(state: Arc<LiveState>) -> Self {
        Self { state }
    }

    /// Standalone view over fixed angle bounds, for drawing without an environment.
    pub fn detached(angle_low: f32, angle_high: f32) -> (Arc<LiveState>, Self) {
        let state = Arc::new(LiveState::new(angle_low, angle_high));
        (state.clone(), Self::new(state))
    }

    pub fn sample(&self) -> LiveSample {
        LiveSample {
            position: self.state.position.load(),
            target: self.state.target.load(),
            reward: self.state.reward.load(),
            angle_low: self.state.angle_low,
            angle_high: self.state.angle_high,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_publish_across_threads() {
        let (state, view) = LiveView::detached(-1.0, 1.0);
        std::thread::spawn(move || {
            state.set_position(0.25);
            state.set_target(-0.5);
            state.set_reward(-0.03);
        })
        .join()
        .unwrap();

        let sample = view.sample();
        assert_eq!(sample.position, 0.25);
        assert_eq!(sample.target, -0.5);
        assert_eq!(sample.reward, -0.03);
        assert_eq!((sample.angle_low, sample.angle_high), (-1.0, 1.0));
    }
}
