//! Environment API tests for the reacher and its normalizing wrapper.
//!
//! These tests define:
//! - Construction checks against the communicator setup
//! - The start/close lifecycle and errors outside it
//! - Observation layout, action clipping and the per-step reward
//! - Episode truncation
//! - Both lockstep and wall-clock timing

use trust_region_rl::Environment;

use crate::communicator::{CommunicatorSetup, DxlCommunicatorConfig};
use crate::config::{ControlType, ReacherConfig, ResetType, TargetType};
use crate::env::{DxlReacher1D, EnvLifecycle};
use crate::error::EnvError;
use crate::normalized::NormalizedEnv;

fn setup_for(config: &ReacherConfig) -> CommunicatorSetup {
    CommunicatorSetup::new(config.actuator_name.clone(), config.obs_history, DxlCommunicatorConfig::new())
}

fn lockstep(config: ReacherConfig) -> DxlReacher1D {
    let config = config.with_realtime(false);
    let setup = setup_for(&config);
    DxlReacher1D::new(config, &setup).unwrap()
}

fn started(config: ReacherConfig) -> DxlReacher1D {
    let mut env = lockstep(config);
    env.start().unwrap();
    env
}

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn should_create_with_default_config() {
    let env = lockstep(ReacherConfig::default());
    assert_eq!(env.observation_size(), 4);
    assert_eq!(env.action_dim(), 1);
    assert_eq!(env.action_bounds(), (vec![-100.0], vec![100.0]));
    assert!(!env.is_started());
}

#[test]
fn should_reject_unknown_communicator_name() {
    let config = ReacherConfig::default().with_realtime(false);
    let setup = CommunicatorSetup::new("OTHER", 1, DxlCommunicatorConfig::new());
    let result = DxlReacher1D::new(config, &setup);
    assert!(matches!(result, Err(EnvError::InvalidConfig(_))));
}

#[test]
fn should_reject_history_mismatch() {
    let config = ReacherConfig::default().with_realtime(false);
    let setup = CommunicatorSetup::new("DXL", 2, DxlCommunicatorConfig::new());
    let result = DxlReacher1D::new(config, &setup);
    assert!(matches!(result, Err(EnvError::InvalidConfig(_))));
}

#[test]
fn should_report_missing_driver_for_device_path() {
    let config = ReacherConfig::default();
    let dxl = DxlCommunicatorConfig::new().with_device_path(Some("/dev/ttyUSB0".to_string()));
    let setup = CommunicatorSetup::new("DXL", 1, dxl);

    match DxlReacher1D::new(config, &setup) {
        Err(EnvError::DriverUnavailable { device_path }) => assert_eq!(device_path, "/dev/ttyUSB0"),
        other => panic!("expected DriverUnavailable, got {:?}", other.err()),
    }
}

#[test]
fn should_use_velocity_bounds_in_velocity_control() {
    let env = lockstep(ReacherConfig::default().with_control_type(ControlType::Velocity));
    assert_eq!(env.action_bounds(), (vec![-2.0], vec![2.0]));
}

// ============================================================================
// Lifecycle Tests
// ============================================================================

#[test]
fn should_refuse_reset_and_step_before_start() {
    let mut env = lockstep(ReacherConfig::default());
    assert!(matches!(env.reset(), Err(EnvError::NotStarted)));
    assert!(matches!(env.step(&[0.0]), Err(EnvError::NotStarted)));
}

#[test]
fn should_refuse_second_start() {
    let mut env = started(ReacherConfig::default());
    assert!(matches!(env.start(), Err(EnvError::AlreadyStarted)));
}

#[test]
fn should_close_idempotently() {
    let mut env = started(ReacherConfig::default());
    env.reset().unwrap();
    assert!(env.close().is_ok());
    assert!(env.close().is_ok());
    assert!(!env.is_started());
    assert!(matches!(env.step(&[0.0]), Err(EnvError::NotStarted)));
}

#[test]
fn should_run_with_background_sensor_polling() {
    let config = ReacherConfig::default()
        .with_dt(0.02)
        .with_episode_length_step(Some(3))
        .with_target_type(TargetType::Fixed(0.2));
    let setup = setup_for(&config);
    let mut env = DxlReacher1D::new(config, &setup).unwrap();

    env.start().unwrap();
    env.reset().unwrap();
    let mut last = None;
    for _ in 0..3 {
        last = Some(env.step(&[10.0]).unwrap());
    }
    assert!(last.unwrap().truncated);
    assert!(env.close().is_ok());
}

// ============================================================================
// Episode Tests
// ============================================================================

#[test]
fn should_truncate_after_fifty_steps() {
    let mut env = started(ReacherConfig::default());
    env.reset().unwrap();

    for i in 1..50 {
        let step = env.step(&[0.0]).unwrap();
        assert!(!step.done(), "step {} should not end the episode", i);
    }
    let last = env.step(&[0.0]).unwrap();
    assert!(last.truncated);
    assert!(!last.terminal);
    assert_eq!(env.episode_step(), 50);

    env.reset().unwrap();
    assert_eq!(env.episode_step(), 0);
}

#[test]
fn should_draw_targets_inside_joint_range() {
    let mut env = started(ReacherConfig::default().with_seed(11));
    let (low, high) = env.angle_bounds();
    let mut targets = Vec::new();
    for _ in 0..5 {
        env.reset().unwrap();
        targets.push(env.target());
    }
    assert!(targets.iter().all(|&t| t >= low && t < high));
    assert!(targets.windows(2).any(|w| w[0] != w[1]), "targets should vary: {:?}", targets);
}

#[test]
fn should_keep_fixed_target() {
    let mut env = started(ReacherConfig::default().with_target_type(TargetType::Fixed(0.3)));
    for _ in 0..3 {
        let obs = env.reset().unwrap();
        assert_eq!(env.target(), 0.3);
        assert_eq!(obs[2], 0.3);
    }
}

#[test]
fn should_return_near_zero_after_reset() {
    let mut env = started(ReacherConfig::default().with_episode_length_step(Some(20)));
    env.reset().unwrap();
    for _ in 0..20 {
        env.step(&[100.0]).unwrap();
    }
    let obs = env.reset().unwrap();
    assert!(obs[0].abs() < 0.05, "reset left the joint at {}", obs[0]);
}

#[test]
fn should_start_random_resets_inside_range() {
    let mut env = started(ReacherConfig::default().with_reset_type(ResetType::Random));
    let (low, high) = env.angle_bounds();
    for _ in 0..3 {
        let obs = env.reset().unwrap();
        assert!(obs[0] >= low && obs[0] <= high);
    }
}

// ============================================================================
// Observation, Action and Reward Tests
// ============================================================================

#[test]
fn should_stack_history_then_target_and_action() {
    let mut env = started(
        ReacherConfig::default()
            .with_obs_history(3)
            .with_target_type(TargetType::Fixed(-0.4)),
    );
    assert_eq!(env.observation_size(), 8);

    let obs = env.reset().unwrap();
    assert_eq!(obs.len(), 8);
    assert_eq!(obs[6], -0.4);
    assert_eq!(obs[7], 0.0);

    let step = env.step(&[50.0]).unwrap();
    assert_eq!(step.observation.len(), 8);
    assert_eq!(step.observation[7], 50.0);
}

#[test]
fn should_clip_actions_to_torque_bound() {
    let mut env = started(ReacherConfig::default());
    env.reset().unwrap();
    let step = env.step(&[1.0e6]).unwrap();
    assert_eq!(step.observation[3], 100.0);
    let step = env.step(&[-1.0e6]).unwrap();
    assert_eq!(step.observation[3], -100.0);
}

#[test]
fn should_reject_wrong_action_dimension() {
    let mut env = started(ReacherConfig::default());
    env.reset().unwrap();
    assert!(matches!(
        env.step(&[1.0, 2.0]),
        Err(EnvError::ActionDimensionMismatch { expected: 1, actual: 2 })
    ));
}

#[test]
fn should_reward_negative_distance_times_dt() {
    let mut env = started(ReacherConfig::default().with_target_type(TargetType::Fixed(0.5)));
    env.reset().unwrap();
    for _ in 0..5 {
        let step = env.step(&[20.0]).unwrap();
        let position = step.observation[0];
        let expected = -(0.5 - position).abs() * 0.04;
        assert!((step.reward - expected).abs() < 1e-6);
        assert!(step.reward <= 0.0);
    }
}

#[test]
fn should_move_toward_positive_torque() {
    let mut env = started(ReacherConfig::default());
    let start = env.reset().unwrap()[0];
    let mut obs = Vec::new();
    for _ in 0..5 {
        obs = env.step(&[100.0]).unwrap().observation;
    }
    assert!(obs[0] > start + 0.05, "joint did not move: {} -> {}", start, obs[0]);
    assert!(obs[1] > 0.0);
}

#[test]
fn should_publish_live_state() {
    let mut env = started(ReacherConfig::default().with_target_type(TargetType::Fixed(-0.2)));
    let view = env.live_view();
    env.reset().unwrap();
    let step = env.step(&[30.0]).unwrap();

    let sample = view.sample();
    assert_eq!(sample.target, -0.2);
    assert_eq!(sample.position, step.observation[0]);
    assert_eq!(sample.reward, step.reward);
    assert_eq!((sample.angle_low, sample.angle_high), env.angle_bounds());
}

// ============================================================================
// Normalized Wrapper Tests
// ============================================================================

#[test]
fn should_expose_unit_action_box() {
    let env = NormalizedEnv::new(lockstep(ReacherConfig::default()));
    assert_eq!(env.action_bounds(), (vec![-1.0], vec![1.0]));
    assert_eq!(env.observation_size(), 4);
}

#[test]
fn should_map_unit_actions_onto_torque_range() {
    let env = NormalizedEnv::new(lockstep(ReacherConfig::default()));
    assert_eq!(env.denormalize(&[1.0]), vec![100.0]);
    assert_eq!(env.denormalize(&[-1.0]), vec![-100.0]);
    assert_eq!(env.denormalize(&[0.0]), vec![0.0]);
    assert_eq!(env.denormalize(&[0.5]), vec![50.0]);
    assert_eq!(env.denormalize(&[3.0]), vec![100.0]);
}

#[test]
fn should_forward_lifecycle_through_wrapper() {
    let mut env = NormalizedEnv::new(lockstep(ReacherConfig::default()));
    assert!(matches!(env.reset(), Err(EnvError::NotStarted)));
    env.start().unwrap();
    env.reset().unwrap();

    let step = env.step(&[0.25]).unwrap();
    assert_eq!(step.observation[3], 25.0);
    assert_eq!(env.live_view().sample().reward, step.reward);

    env.close().unwrap();
    assert!(!env.inner().is_started());
}
