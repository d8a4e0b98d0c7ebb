//! Cascaded balance controller
//!
//! Two nested loops keep the chassis upright while tracking a commanded
//! travel speed. The outer loop runs every 100 ms and converts the speed
//! error into a tilt target within a narrow window, so speed regulation
//! only leans the robot and never drives the motors directly. The inner
//! loop runs on every update and converts the tilt error into a signed
//! base speed for the wheels.
//!
//! There are no wheel encoders: the "estimated" speed is an exponential
//! moving average of the commanded output. It tracks what was asked of the
//! motors, not what the wheels actually did, so slip and stall are
//! invisible to the outer loop.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::control::{Pid, PidConfig};
use crate::math::{Filter, LowPassFilter};
use crate::time;
use crate::{Error, Result};

/// Tilt target window for the outer loop, degrees.
const TARGET_ANGLE_LIMIT_DEG: f64 = 7.0;
/// Inner-loop integral accumulator limit, degree-seconds.
const INTEGRAL_LIMIT: f64 = 500.0;
/// Outer-loop cadence, milliseconds.
const OUTER_INTERVAL_MS: u32 = 100;
/// Smoothing weight of the commanded-speed estimate.
const SPEED_ESTIMATE_ALPHA: f64 = 0.1;

/// Balance controller tuning
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Inner-loop proportional gain, speed units per degree of tilt error
    pub kp: f64,
    /// Inner-loop integral gain
    pub ki: f64,
    /// Inner-loop derivative gain
    pub kd: f64,
    /// Outer-loop proportional gain, degrees per unit of normalized speed error
    pub outer_kp: f64,
    /// Calibration bias subtracted from the measured tilt, degrees
    pub balance_offset: f64,
    /// Output ceiling in speed units (steps/s at the wheels)
    pub max_speed: f64,
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            kp: 200.0,
            ki: 5.0,
            kd: 8.0,
            outer_kp: 5.0,
            balance_offset: 0.0,
            max_speed: 15_000.0,
        }
    }
}

impl BalanceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the inner-loop gains
    pub fn with_inner_gains(mut self, kp: f64, ki: f64, kd: f64) -> Self {
        self.kp = kp;
        self.ki = ki;
        self.kd = kd;
        self
    }

    /// Set the outer-loop gain
    pub fn with_outer_gain(mut self, kp: f64) -> Self {
        self.outer_kp = kp;
        self
    }

    /// Set the tilt calibration bias, degrees
    pub fn with_balance_offset(mut self, degrees: f64) -> Self {
        self.balance_offset = degrees;
        self
    }

    /// Set the output ceiling
    pub fn with_max_speed(mut self, max_speed: f64) -> Self {
        self.max_speed = max_speed;
        self
    }

    /// Check gains and limits
    pub fn validate(&self) -> Result<()> {
        if !(self.kp.is_finite() && self.ki.is_finite() && self.kd.is_finite()) {
            return Err(Error::Config("balance gains must be finite".into()));
        }
        if !self.outer_kp.is_finite() {
            return Err(Error::Config("outer loop gain must be finite".into()));
        }
        if !self.balance_offset.is_finite() {
            return Err(Error::Config("balance offset must be finite".into()));
        }
        if !(self.max_speed.is_finite() && self.max_speed > 0.0) {
            return Err(Error::Config(format!(
                "max speed must be positive, got {}",
                self.max_speed
            )));
        }
        Ok(())
    }
}

/// Cascaded tilt and speed controller for a two-wheeled balancer
///
/// Starts disabled with zeroed state. Call [`begin`](Self::begin) once to
/// seed the timing baselines, then [`update`](Self::update) on every PID
/// interval with a fresh tilt reading. Disabling at any point zeroes the
/// accumulators and the output, so a later re-enable starts clean.
#[derive(Debug, Clone)]
pub struct BalanceController {
    inner: Pid,
    outer: Pid,
    speed_filter: LowPassFilter,
    balance_offset: f64,
    max_speed: f64,
    target_speed: f64,
    target_angle: f64,
    base_speed: f64,
    estimated_speed: f64,
    last_inner_ms: u32,
    last_outer_ms: u32,
    enabled: bool,
}

impl BalanceController {
    /// Create a controller from the given tuning
    pub fn new(config: BalanceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Pid::new(
                PidConfig::new(config.kp, config.ki, config.kd)
                    .with_integral_limit(INTEGRAL_LIMIT),
            ),
            outer: Pid::p(config.outer_kp),
            speed_filter: LowPassFilter::new(SPEED_ESTIMATE_ALPHA),
            balance_offset: config.balance_offset,
            max_speed: config.max_speed,
            target_speed: 0.0,
            target_angle: 0.0,
            base_speed: 0.0,
            estimated_speed: 0.0,
            last_inner_ms: 0,
            last_outer_ms: 0,
            enabled: false,
        })
    }

    /// Seed both loop timing baselines. Call once before the first update.
    pub fn begin(&mut self, now_ms: u32) {
        self.last_inner_ms = now_ms;
        self.last_outer_ms = now_ms;
    }

    /// Run one controller step
    ///
    /// `tilt_deg` is the current tilt reading and `now_ms` the wrapping
    /// millisecond count sampled by the caller. While disabled, the output
    /// and the speed estimate are forced to zero regardless of stored state.
    pub fn update(&mut self, tilt_deg: f64, now_ms: u32) {
        if !self.enabled {
            self.base_speed = 0.0;
            self.estimated_speed = 0.0;
            return;
        }

        let dt = f64::from(time::elapsed(now_ms, self.last_inner_ms)) / 1000.0;
        self.last_inner_ms = now_ms;

        self.run_outer_loop(now_ms);
        self.run_inner_loop(tilt_deg, dt);
        self.update_speed_estimate();
    }

    /// Speed error to tilt target, on its own slower cadence.
    fn run_outer_loop(&mut self, now_ms: u32) {
        let elapsed = time::elapsed(now_ms, self.last_outer_ms);
        if elapsed < OUTER_INTERVAL_MS {
            return;
        }
        let dt = f64::from(elapsed) / 1000.0;
        self.last_outer_ms = now_ms;

        let speed_error = (self.target_speed - self.estimated_speed) / self.max_speed;
        self.target_angle = self
            .outer
            .update_error(speed_error, dt)
            .clamp(-TARGET_ANGLE_LIMIT_DEG, TARGET_ANGLE_LIMIT_DEG);
    }

    /// Tilt error to signed base speed.
    fn run_inner_loop(&mut self, tilt_deg: f64, dt: f64) {
        let adjusted = tilt_deg - self.balance_offset;
        let output = self.inner.update(self.target_angle, adjusted, dt);
        self.base_speed = output.clamp(-self.max_speed, self.max_speed);
    }

    fn update_speed_estimate(&mut self) {
        self.estimated_speed = self
            .speed_filter
            .update(self.base_speed)
            .clamp(-self.max_speed, self.max_speed);
    }

    /// Set the commanded travel speed, clamped to the output ceiling
    pub fn set_target_speed(&mut self, speed: f64) {
        self.target_speed = speed.clamp(-self.max_speed, self.max_speed);
    }

    /// Enable or disable the controller
    ///
    /// Disabling zeroes the integral accumulator, the previous error, the
    /// speed estimate, and the output. The tilt target and the commanded
    /// speed are kept.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            debug!(enabled, "balance controller toggled");
        }
        self.enabled = enabled;
        if !enabled {
            self.inner.reset();
            self.speed_filter.reset();
            self.base_speed = 0.0;
            self.estimated_speed = 0.0;
        }
    }

    /// Disable the controller and zero the commanded speed. Idempotent.
    pub fn emergency_stop(&mut self) {
        self.set_enabled(false);
        self.target_speed = 0.0;
    }

    /// Replace the inner-loop gains and clear the integral accumulator
    pub fn set_inner_gains(&mut self, kp: f64, ki: f64, kd: f64) {
        self.inner.set_gains(kp, ki, kd);
        self.inner.reset_integral();
    }

    /// Replace the outer-loop gain
    pub fn set_outer_gain(&mut self, kp: f64) {
        self.outer.set_gains(kp, 0.0, 0.0);
    }

    /// Replace the tilt calibration bias, degrees
    pub fn set_balance_offset(&mut self, degrees: f64) {
        self.balance_offset = degrees;
    }

    /// Replace the output ceiling. Non-positive or non-finite values are
    /// ignored; the stored command is re-clamped to the new ceiling.
    pub fn set_max_speed(&mut self, max_speed: f64) {
        if max_speed.is_finite() && max_speed > 0.0 {
            self.max_speed = max_speed;
            self.target_speed = self.target_speed.clamp(-max_speed, max_speed);
        }
    }

    /// Signed wheel base speed from the last update
    pub fn base_speed(&self) -> f64 {
        self.base_speed
    }

    /// Tilt target the outer loop last produced, degrees
    pub fn target_angle(&self) -> f64 {
        self.target_angle
    }

    /// Smoothed commanded speed
    ///
    /// This follows the output the controller asked for, not measured wheel
    /// motion.
    pub fn estimated_speed(&self) -> f64 {
        self.estimated_speed
    }

    /// Commanded travel speed after clamping
    pub fn target_speed(&self) -> f64 {
        self.target_speed
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
