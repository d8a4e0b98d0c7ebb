//! Robot orchestrator
//!
//! Owns the two pulse generators, the balance controller, the fall latch,
//! and the command mapping. [`Robot::run`] is called from one cooperative
//! loop as fast as possible: pulse timing is serviced on every call,
//! everything else runs on the PID cadence.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::command::CommandSource;
use crate::control::{BalanceConfig, BalanceController};
use crate::hardware::{MotorPort, Rotation, StepperConfig, StepperMotor, TiltSensor};
use crate::math::map_range;
use crate::time::{self, Clock};
use crate::{Error, Result};

/// Orchestrator limits and cadence, with the component tunings nested
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Wheel speed ceiling for the differential mix, steps/s
    pub max_speed: f64,
    /// Steer authority; the steer scalar maps onto [-max_steer, +max_steer]
    pub max_steer: f64,
    /// Tilt magnitude that latches the fall state, degrees
    pub fall_angle_deg: f64,
    /// Cadence of the balance, fall-check, and steering block, milliseconds
    pub pid_interval_ms: u32,
    /// Balance controller tuning
    pub balance: BalanceConfig,
    /// Pulse generator limits, applied to both motors
    pub stepper: StepperConfig,
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            max_speed: 50_000.0,
            max_steer: 2_000.0,
            fall_angle_deg: 40.0,
            pid_interval_ms: 10,
            balance: BalanceConfig::default(),
            stepper: StepperConfig::default(),
        }
    }
}

impl RobotConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the wheel speed ceiling
    pub fn with_max_speed(mut self, max_speed: f64) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Set the steer authority
    pub fn with_max_steer(mut self, max_steer: f64) -> Self {
        self.max_steer = max_steer;
        self
    }

    /// Set the fall threshold, degrees
    pub fn with_fall_angle(mut self, degrees: f64) -> Self {
        self.fall_angle_deg = degrees;
        self
    }

    /// Set the PID cadence, milliseconds
    pub fn with_pid_interval_ms(mut self, interval: u32) -> Self {
        self.pid_interval_ms = interval;
        self
    }

    /// Replace the balance tuning
    pub fn with_balance(mut self, balance: BalanceConfig) -> Self {
        self.balance = balance;
        self
    }

    /// Replace the pulse generator limits
    pub fn with_stepper(mut self, stepper: StepperConfig) -> Self {
        self.stepper = stepper;
        self
    }

    /// Check the orchestrator limits and both nested configs
    pub fn validate(&self) -> Result<()> {
        if !(self.max_speed.is_finite() && self.max_speed > 0.0) {
            return Err(Error::Config(format!(
                "wheel speed ceiling must be positive, got {}",
                self.max_speed
            )));
        }
        if !(self.max_steer.is_finite() && self.max_steer >= 0.0) {
            return Err(Error::Config("steer authority must be non-negative".into()));
        }
        if !(self.fall_angle_deg.is_finite() && self.fall_angle_deg > 0.0) {
            return Err(Error::Config(format!(
                "fall threshold must be positive, got {}",
                self.fall_angle_deg
            )));
        }
        if self.pid_interval_ms == 0 {
            return Err(Error::Config("PID interval must be nonzero".into()));
        }
        self.balance.validate()?;
        self.stepper.validate()
    }
}

/// Snapshot of the orchestrator state for reporting layers
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RobotStatus {
    pub fallen: bool,
    pub tilt_deg: f64,
    pub target_angle_deg: f64,
    pub target_speed: f64,
    pub estimated_speed: f64,
    pub base_speed: f64,
    pub left_speed: f64,
    pub right_speed: f64,
    pub left_position: i64,
    pub right_position: i64,
}

/// Two-wheeled balancer orchestrator
///
/// Generic over its collaborator seams so tests and simulation inject
/// doubles: the tilt source, the motor ports, the command source, and the
/// clock.
///
/// A tilt past the fall threshold zeroes both motors and disables balancing
/// in the same cycle that latches the fall, so no later cycle can act on a
/// stale command. The latch is not permanent: once the tilt reading returns
/// inside the threshold, balancing resumes on its own. There is no debounce
/// on recovery; a sensor bouncing around the threshold will chatter the
/// latch, which is visible in the logs.
pub struct Robot<S: TiltSensor, P: MotorPort, K: CommandSource, C: Clock> {
    sensor: S,
    left: StepperMotor<P>,
    right: StepperMotor<P>,
    balance: BalanceController,
    commands: K,
    clock: C,
    config: RobotConfig,
    fallen: bool,
    last_pid_ms: u32,
    last_left_speed: f64,
    last_right_speed: f64,
}

impl<S: TiltSensor, P: MotorPort, K: CommandSource, C: Clock> Robot<S, P, K, C> {
    /// Assemble a robot from its collaborators, validating all configs
    pub fn new(
        config: RobotConfig,
        sensor: S,
        left_port: P,
        right_port: P,
        commands: K,
        clock: C,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            sensor,
            left: StepperMotor::with_config(left_port, config.stepper)?,
            right: StepperMotor::with_config(right_port, config.stepper)?,
            balance: BalanceController::new(config.balance)?,
            commands,
            clock,
            config,
            fallen: false,
            last_pid_ms: 0,
            last_left_speed: 0.0,
            last_right_speed: 0.0,
        })
    }

    /// Bring all actuation to a known state and start balancing: ports to
    /// safe idle, driver stages on, cadence baselines seeded
    pub fn begin(&mut self) {
        let now_ms = self.clock.now_millis();
        self.left.begin();
        self.right.begin();
        self.left.set_motor_enable(true);
        self.right.set_motor_enable(true);
        self.balance.begin(now_ms);
        self.balance.set_enabled(true);
        self.last_pid_ms = now_ms;
        info!("robot initialized, balancing enabled");
    }

    /// One cooperative-loop iteration
    ///
    /// Both pulse generators are serviced on every call, before anything
    /// else and regardless of the fall latch. The balance, fall-check, and
    /// steering block then runs if a full PID interval has elapsed.
    pub fn run(&mut self) {
        let now_us = self.clock.now_micros();
        self.left.run(now_us);
        self.right.run(now_us);

        let now_ms = self.clock.now_millis();
        if time::elapsed(now_ms, self.last_pid_ms) < self.config.pid_interval_ms {
            return;
        }
        self.last_pid_ms = now_ms;

        self.sensor.update();
        let tilt = self.sensor.tilt_degrees();

        if tilt.abs() > self.config.fall_angle_deg {
            self.stop_wheels();
            self.balance.emergency_stop();
            if !self.fallen {
                self.fallen = true;
                warn!(tilt_deg = tilt, "tilt past fall threshold, actuation stopped");
            }
            return;
        }

        if self.fallen {
            self.fallen = false;
            self.balance.set_enabled(true);
            info!(tilt_deg = tilt, "tilt recovered, balancing resumed");
        }

        let cmd = self.commands.latest();
        let target_speed = f64::from(cmd.direction.longitudinal())
            * (f64::from(cmd.speed) / 255.0)
            * self.config.max_speed;
        let steer = map_range(
            f64::from(cmd.steer.min(100)),
            0.0,
            100.0,
            -self.config.max_steer,
            self.config.max_steer,
        );

        self.balance.set_target_speed(target_speed);
        self.balance.update(tilt, now_ms);

        let base = self.balance.base_speed();
        let left = (base + steer).clamp(-self.config.max_speed, self.config.max_speed);
        let right = (base - steer).clamp(-self.config.max_speed, self.config.max_speed);
        self.command_wheels(left, right);
    }

    /// Latch directions and speed magnitudes on both wheels.
    fn command_wheels(&mut self, left: f64, right: f64) {
        // mirrored mounting: robot-forward is electrically opposite
        // rotations on the two motors
        self.left.set_direction(if left >= 0.0 {
            Rotation::Backward
        } else {
            Rotation::Forward
        });
        self.right.set_direction(if right >= 0.0 {
            Rotation::Forward
        } else {
            Rotation::Backward
        });
        self.left.set_speed(left.abs());
        self.right.set_speed(right.abs());
        self.last_left_speed = left;
        self.last_right_speed = right;
    }

    fn stop_wheels(&mut self) {
        self.left.set_speed(0.0);
        self.right.set_speed(0.0);
        self.last_left_speed = 0.0;
        self.last_right_speed = 0.0;
    }

    /// Snapshot for reporting layers
    pub fn status(&self) -> RobotStatus {
        RobotStatus {
            fallen: self.fallen,
            tilt_deg: self.sensor.tilt_degrees(),
            target_angle_deg: self.balance.target_angle(),
            target_speed: self.balance.target_speed(),
            estimated_speed: self.balance.estimated_speed(),
            base_speed: self.balance.base_speed(),
            left_speed: self.last_left_speed,
            right_speed: self.last_right_speed,
            left_position: self.left.position(),
            right_position: self.right.position(),
        }
    }

    /// Fall latch state
    pub fn is_fallen(&self) -> bool {
        self.fallen
    }

    /// Balance controller access, for tuning at setup time
    pub fn balance(&self) -> &BalanceController {
        &self.balance
    }

    pub fn balance_mut(&mut self) -> &mut BalanceController {
        &mut self.balance
    }

    /// Left pulse generator, for positions and port inspection
    pub fn left(&self) -> &StepperMotor<P> {
        &self.left
    }

    /// Right pulse generator
    pub fn right(&self) -> &StepperMotor<P> {
        &self.right
    }
}
