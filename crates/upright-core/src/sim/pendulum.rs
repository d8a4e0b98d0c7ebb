//! Planar inverted-pendulum model
//!
//! Deliberately small: a point mass on a massless rod above the wheel
//! axle, torqued by gravity and by the commanded wheel acceleration. Good
//! enough to watch the balance cascade catch a lean or lose one, not a
//! dynamics reference.
//!
//! Sign convention matches the control loop: positive tilt is the lean
//! that a positive (robot-forward) wheel speed makes worse, so driving
//! against the sign of the tilt is what rights the chassis.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Pendulum geometry and integration parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PendulumConfig {
    /// Center-of-mass height above the axle, meters
    pub com_height_m: f64,
    /// Gravity, m/s^2
    pub gravity: f64,
    /// Wheel steps per meter of travel
    pub steps_per_meter: f64,
    /// Viscous damping on the tilt rate, 1/s
    pub damping: f64,
    /// Tilt at the start of the run, degrees
    pub initial_tilt_deg: f64,
}

impl Default for PendulumConfig {
    fn default() -> Self {
        Self {
            com_height_m: 0.10,
            gravity: 9.81,
            steps_per_meter: 12_700.0, // 3200 steps/rev on 80 mm diameter wheels
            damping: 0.1,
            initial_tilt_deg: 0.0,
        }
    }
}

impl PendulumConfig {
    /// Set the starting tilt, degrees
    pub fn with_initial_tilt(mut self, degrees: f64) -> Self {
        self.initial_tilt_deg = degrees;
        self
    }

    /// Set the center-of-mass height, meters
    pub fn with_com_height(mut self, meters: f64) -> Self {
        self.com_height_m = meters;
        self
    }

    /// Set the step-to-travel conversion
    pub fn with_steps_per_meter(mut self, steps: f64) -> Self {
        self.steps_per_meter = steps;
        self
    }

    /// Check geometry and integration parameters
    pub fn validate(&self) -> Result<()> {
        if !(self.com_height_m.is_finite() && self.com_height_m > 0.0) {
            return Err(Error::Config("center-of-mass height must be positive".into()));
        }
        if !(self.gravity.is_finite() && self.gravity > 0.0) {
            return Err(Error::Config("gravity must be positive".into()));
        }
        if !(self.steps_per_meter.is_finite() && self.steps_per_meter > 0.0) {
            return Err(Error::Config("steps per meter must be positive".into()));
        }
        if !(self.damping.is_finite() && self.damping >= 0.0) {
            return Err(Error::Config("damping must be non-negative".into()));
        }
        if !self.initial_tilt_deg.is_finite() {
            return Err(Error::Config("initial tilt must be finite".into()));
        }
        Ok(())
    }
}

/// Pendulum state driven by the commanded wheel speed
///
/// Integration is semi-implicit Euler: the rate picks up the acceleration
/// first, then the angle picks up the new rate. Wheel acceleration is the
/// finite difference of the commanded speed between steps.
#[derive(Debug, Clone)]
pub struct InvertedPendulum {
    config: PendulumConfig,
    tilt_rad: f64,
    tilt_rate: f64,
    wheel_speed_mps: f64,
}

impl InvertedPendulum {
    pub fn new(config: PendulumConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tilt_rad: config.initial_tilt_deg.to_radians(),
            tilt_rate: 0.0,
            wheel_speed_mps: 0.0,
            config,
        })
    }

    /// Advance the model by `dt` seconds with the wheels commanded to the
    /// given signed rate in steps/s. Non-positive `dt` is ignored.
    pub fn step(&mut self, commanded_steps_per_s: f64, dt: f64) {
        if dt <= 0.0 {
            return;
        }

        let wheel_speed = commanded_steps_per_s / self.config.steps_per_meter;
        let wheel_accel = (wheel_speed - self.wheel_speed_mps) / dt;
        self.wheel_speed_mps = wheel_speed;

        let tilt_accel = (self.config.gravity * self.tilt_rad.sin()
            + wheel_accel * self.tilt_rad.cos())
            / self.config.com_height_m
            - self.config.damping * self.tilt_rate;

        self.tilt_rate += tilt_accel * dt;
        self.tilt_rad += self.tilt_rate * dt;
    }

    /// Current tilt, degrees
    pub fn tilt_degrees(&self) -> f64 {
        self.tilt_rad.to_degrees()
    }

    /// Current tilt rate, degrees per second
    pub fn tilt_rate_degrees(&self) -> f64 {
        self.tilt_rate.to_degrees()
    }

    /// Kick the chassis by `degrees` on top of the current tilt, the way a
    /// shove would
    pub fn nudge(&mut self, degrees: f64) {
        self.tilt_rad += degrees.to_radians();
    }

    /// Back to the configured starting state
    pub fn reset(&mut self) {
        self.tilt_rad = self.config.initial_tilt_deg.to_radians();
        self.tilt_rate = 0.0;
        self.wheel_speed_mps = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_upright_is_an_equilibrium() {
        let mut pendulum = InvertedPendulum::new(PendulumConfig::default()).unwrap();
        for _ in 0..1_000 {
            pendulum.step(0.0, 0.001);
        }
        assert_relative_eq!(pendulum.tilt_degrees(), 0.0);
    }

    #[test]
    fn test_uncontrolled_lean_diverges() {
        let config = PendulumConfig::default().with_initial_tilt(1.0);
        let mut pendulum = InvertedPendulum::new(config).unwrap();

        for _ in 0..500 {
            pendulum.step(0.0, 0.001);
        }
        // half a second of freefall turns one degree into a real fall
        assert!(pendulum.tilt_degrees() > 10.0);
        assert!(pendulum.tilt_rate_degrees() > 0.0);
    }

    #[test]
    fn test_counter_drive_fights_the_lean() {
        let config = PendulumConfig::default().with_initial_tilt(1.0);

        let mut free = InvertedPendulum::new(config).unwrap();
        free.step(0.0, 0.001);

        // accelerating the wheels against the lean reduces the tilt pickup
        let mut driven = InvertedPendulum::new(config).unwrap();
        driven.step(-5_000.0, 0.001);

        assert!(driven.tilt_degrees() < free.tilt_degrees());
    }

    #[test]
    fn test_nudge_and_reset() {
        let config = PendulumConfig::default().with_initial_tilt(2.0);
        let mut pendulum = InvertedPendulum::new(config).unwrap();

        pendulum.nudge(10.0);
        assert_relative_eq!(pendulum.tilt_degrees(), 12.0, epsilon = 1e-9);

        pendulum.step(0.0, 0.001);
        pendulum.reset();
        assert_relative_eq!(pendulum.tilt_degrees(), 2.0, epsilon = 1e-9);
        assert_relative_eq!(pendulum.tilt_rate_degrees(), 0.0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let flat = PendulumConfig::default().with_com_height(0.0);
        assert!(InvertedPendulum::new(flat).is_err());

        let bad_steps = PendulumConfig::default().with_steps_per_meter(-1.0);
        assert!(InvertedPendulum::new(bad_steps).is_err());
    }
}
