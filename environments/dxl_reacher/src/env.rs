//! One degree-of-freedom reaching task on a Dynamixel servo.
//!
//! Each episode draws a target angle; the policy commands torque (or goal
//! velocity) every `dt` seconds and is rewarded for staying close to the
//! target. Episodes end by truncation after a fixed number of steps.
//!
//! # Timing
//!
//! - `realtime = true`: a poller thread reads a sensor packet every
//!   `sensor_dt` in wall-clock time and `step` is paced to one control period.
//!   This is how the task runs against a physical servo.
//! - `realtime = false`: `step` reads `dt / sensor_dt` packets itself, so the
//!   (simulated) device advances in lockstep with the learner.
//!
//! # Observation
//!
//! `[pos_0, vel_0, ..., pos_{h-1}, vel_{h-1}, target, last_action]` for an
//! observation history of `h` sensor packets, oldest first.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use trust_region_rl::{Environment, Step};

use crate::communicator::{ActuatorCommand, CommError, Communicator, CommunicatorSetup, SensorPacket};
use crate::config::{ControlType, ReacherConfig, ResetType, TargetType};
use crate::error::{EnvError, EnvResult};
use crate::live_state::{LiveState, LiveView};
use crate::reward::compute_reward;

/// Start/stop control of environments that own device threads.
pub trait EnvLifecycle {
    /// Connect the device and start background sensing.
    fn start(&mut self) -> EnvResult<()>;

    /// Stop background sensing and release the device. Idempotent.
    fn close(&mut self) -> EnvResult<()>;

    /// Read handle onto the live position, target and reward.
    fn live_view(&self) -> LiveView;
}

type SharedCommunicator = Arc<Mutex<Box<dyn Communicator>>>;

/// Most recent sensor packets, oldest first.
#[derive(Debug)]
struct SensorHistory {
    packets: VecDeque<SensorPacket>,
    capacity: usize,
}

impl SensorHistory {
    fn new(capacity: usize) -> Self {
        let mut packets = VecDeque::with_capacity(capacity);
        packets.resize(capacity, SensorPacket::default());
        Self { packets, capacity }
    }

    fn push(&mut self, packet: SensorPacket) {
        if self.packets.len() == self.capacity {
            self.packets.pop_front();
        }
        self.packets.push_back(packet);
    }

    fn latest(&self) -> SensorPacket {
        self.packets.back().copied().unwrap_or_default()
    }
}

struct Poller {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Dynamixel reacher environment.
pub struct DxlReacher1D {
    config: ReacherConfig,
    communicator: SharedCommunicator,
    sensor_dt: f32,
    reads_per_step: usize,
    sensors: Arc<Mutex<SensorHistory>>,
    poll_error: Arc<Mutex<Option<CommError>>>,
    poller: Option<Poller>,
    live: Arc<LiveState>,
    rng: Xoshiro256StarStar,
    started: bool,
    target: f32,
    last_action: f32,
    step_count: usize,
    episode_steps: usize,
    last_tick: Option<Instant>,
}

impl DxlReacher1D {
    /// Build the environment and open its communicator.
    pub fn new(config: ReacherConfig, setup: &CommunicatorSetup) -> EnvResult<Self> {
        config.validate()?;
        if setup.name != config.actuator_name {
            return Err(EnvError::InvalidConfig(format!(
                "no communicator named '{}' (got '{}')",
                config.actuator_name, setup.name
            )));
        }
        if setup.num_sensor_packets != config.obs_history {
            return Err(EnvError::InvalidConfig(format!(
                "communicator keeps {} sensor packets but obs_history is {}",
                setup.num_sensor_packets, config.obs_history
            )));
        }

        let communicator = setup.build(config.setup.angle_low, config.setup.angle_high, config.seed)?;
        let sensor_dt = communicator.sensor_dt();
        let reads_per_step = ((config.dt / sensor_dt).round() as usize).max(1);
        let live = Arc::new(LiveState::new(config.setup.angle_low, config.setup.angle_high));

        log::info!(
            "{} reacher: dt {}s ({} sensor reads), {} steps per episode, {:?} control, {:?} reset, {}",
            config.setup.name,
            config.dt,
            reads_per_step,
            config.episode_steps(),
            config.control_type,
            config.reset_type,
            if config.realtime { "realtime" } else { "lockstep" }
        );

        Ok(Self {
            rng: Xoshiro256StarStar::seed_from_u64(config.seed),
            episode_steps: config.episode_steps(),
            sensors: Arc::new(Mutex::new(SensorHistory::new(config.obs_history))),
            config,
            communicator: Arc::new(Mutex::new(communicator)),
            sensor_dt,
            reads_per_step,
            poll_error: Arc::new(Mutex::new(None)),
            poller: None,
            live,
            started: false,
            target: 0.0,
            last_action: 0.0,
            step_count: 0,
            last_tick: None,
        })
    }

    pub fn config(&self) -> &ReacherConfig {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Target angle of the current episode.
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Joint angle range `(low, high)`.
    pub fn angle_bounds(&self) -> (f32, f32) {
        (self.config.setup.angle_low, self.config.setup.angle_high)
    }

    /// Steps taken in the current episode.
    pub fn episode_step(&self) -> usize {
        self.step_count
    }

    fn ensure_started(&self) -> EnvResult<()> {
        if self.started {
            Ok(())
        } else {
            Err(EnvError::NotStarted)
        }
    }

    fn read_into_history(&self) -> EnvResult<SensorPacket> {
        let packet = self.communicator.lock().read_sensor()?;
        self.sensors.lock().push(packet);
        Ok(packet)
    }

    fn spawn_poller(&mut self) -> EnvResult<()> {
        let running = Arc::new(AtomicBool::new(true));
        let period = Duration::from_secs_f32(self.sensor_dt);
        let communicator = self.communicator.clone();
        let sensors = self.sensors.clone();
        let poll_error = self.poll_error.clone();
        let live = self.live.clone();
        let flag = running.clone();

        let handle = thread::Builder::new()
            .name("dxl-sensor-poller".to_string())
            .spawn(move || {
                let mut next = Instant::now();
                while flag.load(Ordering::Acquire) {
                    let packet = communicator.lock().read_sensor();
                    match packet {
                        Ok(packet) => {
                            sensors.lock().push(packet);
                            live.set_position(packet.position);
                        }
                        Err(e) => {
                            log::error!("sensor poller stopped: {}", e);
                            *poll_error.lock() = Some(e);
                            break;
                        }
                    }

                    next += period;
                    let now = Instant::now();
                    if next > now {
                        thread::sleep(next - now);
                    } else {
                        next = now;
                    }
                }
            })?;

        self.poller = Some(Poller { running, handle });
        Ok(())
    }

    /// Let one control period pass and refresh the sensor history.
    fn advance(&mut self) -> EnvResult<SensorPacket> {
        if self.config.realtime {
            if let Some(e) = self.poll_error.lock().take() {
                return Err(EnvError::Communication(e));
            }
            let dt = Duration::from_secs_f32(self.config.dt);
            if let Some(last) = self.last_tick {
                let elapsed = last.elapsed();
                if elapsed < dt {
                    thread::sleep(dt - elapsed);
                }
            }
            self.last_tick = Some(Instant::now());
            Ok(self.sensors.lock().latest())
        } else {
            let mut packet = SensorPacket::default();
            for _ in 0..self.reads_per_step {
                packet = self.read_into_history()?;
            }
            Ok(packet)
        }
    }

    fn command(&self, value: f32) -> ActuatorCommand {
        match self.config.control_type {
            ControlType::Torque => ActuatorCommand::Torque(value),
            ControlType::Velocity => ActuatorCommand::Velocity(value),
        }
    }

    fn observation(&self) -> Vec<f32> {
        let sensors = self.sensors.lock();
        let mut obs = Vec::with_capacity(2 * sensors.capacity + 2);
        for packet in &sensors.packets {
            obs.push(packet.position);
            obs.push(packet.velocity);
        }
        obs.push(self.target);
        obs.push(self.last_action);
        obs
    }

    /// Drive the joint to `goal` with a PD torque loop.
    fn move_to(&mut self, goal: f32) -> EnvResult<()> {
        let setup = &self.config.setup;
        let (kp, kd, tol, max_steps) = (setup.reset_kp, setup.reset_kd, setup.reset_tolerance, setup.reset_max_steps);
        let limit = self.config.max_torque_mag;
        let dt = self.config.dt;

        let mut packet = self.sensors.lock().latest();
        for _ in 0..max_steps {
            let error = goal - packet.position;
            if error.abs() < tol && packet.velocity.abs() * dt < tol {
                break;
            }
            let torque = (kp * error - kd * packet.velocity).clamp(-limit, limit);
            self.communicator.lock().write_actuator(ActuatorCommand::Torque(torque))?;
            packet = self.advance()?;
        }
        self.communicator.lock().write_actuator(self.command(0.0))?;

        let miss = (goal - packet.position).abs();
        if miss >= tol {
            log::debug!("reset stopped {:.3} rad from {:.3}", miss, goal);
        }
        Ok(())
    }
}

impl EnvLifecycle for DxlReacher1D {
    fn start(&mut self) -> EnvResult<()> {
        if self.started {
            return Err(EnvError::AlreadyStarted);
        }
        self.communicator.lock().write_actuator(self.command(0.0))?;
        for _ in 0..self.config.obs_history {
            let packet = self.read_into_history()?;
            self.live.set_position(packet.position);
        }
        if self.config.realtime {
            self.spawn_poller()?;
        }
        self.last_tick = None;
        self.started = true;
        log::info!("{} reacher started", self.config.setup.name);
        Ok(())
    }

    fn close(&mut self) -> EnvResult<()> {
        if !self.started {
            return Ok(());
        }
        self.started = false;

        let joined = match self.poller.take() {
            Some(poller) => {
                poller.running.store(false, Ordering::Release);
                poller.handle.join().map_err(|_| EnvError::PollerPanicked)
            }
            None => Ok(()),
        };

        let mut communicator = self.communicator.lock();
        if let Err(e) = communicator.write_actuator(self.command(0.0)) {
            log::warn!("could not zero the actuator on close: {}", e);
        }
        communicator.close();
        log::info!("{} reacher closed", self.config.setup.name);
        joined
    }

    fn live_view(&self) -> LiveView {
        LiveView::new(self.live.clone())
    }
}

impl Environment for DxlReacher1D {
    type Error = EnvError;

    fn observation_size(&self) -> usize {
        2 * self.config.obs_history + 2
    }

    fn action_dim(&self) -> usize {
        1
    }

    fn action_bounds(&self) -> (Vec<f32>, Vec<f32>) {
        let limit = self.config.action_limit();
        (vec![-limit], vec![limit])
    }

    fn reset(&mut self) -> EnvResult<Vec<f32>> {
        self.ensure_started()?;
        let (low, high) = self.angle_bounds();

        self.target = match self.config.target_type {
            TargetType::Position => self.rng.gen_range(low..high),
            TargetType::Fixed(angle) => angle,
        };
        let start = match self.config.reset_type {
            ResetType::Zero => 0.0f32.clamp(low, high),
            ResetType::Random => self.rng.gen_range(low..high),
        };
        self.move_to(start)?;

        self.last_action = 0.0;
        self.step_count = 0;
        self.live.set_target(self.target);
        self.live.set_reward(0.0);
        self.live.set_position(self.sensors.lock().latest().position);
        Ok(self.observation())
    }

    fn step(&mut self, action: &[f32]) -> EnvResult<Step> {
        self.ensure_started()?;
        if action.len() != 1 {
            return Err(EnvError::ActionDimensionMismatch {
                expected: 1,
                actual: action.len(),
            });
        }

        let limit = self.config.action_limit();
        let value = action[0].clamp(-limit, limit);
        self.communicator.lock().write_actuator(self.command(value))?;
        let packet = self.advance()?;

        self.step_count += 1;
        self.last_action = value;
        let reward = compute_reward(self.config.reward_type, self.target, packet.position, self.config.dt);
        self.live.set_position(packet.position);
        self.live.set_reward(reward);

        let truncated = self.step_count >= self.episode_steps;
        Ok(Step::new(self.observation(), reward, false, truncated))
    }
}

impl Drop for DxlReacher1D {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            log::warn!("reacher close on drop failed: {}", e);
        }
    }
}
