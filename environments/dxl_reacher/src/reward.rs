//! Per-step reward.

use crate::config::RewardType;

/// Reward of one control period ending at `position`.
#[inline]
pub fn compute_reward(reward_type: RewardType, target: f32, position: f32, dt: f32) -> f32 {
    let error = target - position;
    match reward_type {
        RewardType::Linear => -error.abs() * dt,
        RewardType::Quadratic => -error * error * dt,
    }
}
