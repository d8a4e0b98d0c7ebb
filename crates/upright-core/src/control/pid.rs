//! PID controller used by both loops of the balance cascade
//!
//! Deliberately small: gains, a clamped integral accumulator, and a raw
//! derivative guarded against zero elapsed time. Output shaping (speed
//! ceilings, the tilt-target window) belongs to the caller, so this
//! controller carries no output limits of its own.

use serde::{Deserialize, Serialize};

/// PID controller configuration
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidConfig {
    /// Proportional gain
    pub kp: f64,
    /// Integral gain
    pub ki: f64,
    /// Derivative gain
    pub kd: f64,
    /// Integral windup limit in error-seconds (f64::INFINITY for no limit)
    pub integral_limit: f64,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
            integral_limit: f64::INFINITY,
        }
    }
}

impl PidConfig {
    /// Create a new PID config with given gains
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            ..Default::default()
        }
    }

    /// Set integral windup limit
    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = limit;
        self
    }

    /// Create a P-only controller
    pub fn p(kp: f64) -> Self {
        Self::new(kp, 0.0, 0.0)
    }

    /// Create a PI controller
    pub fn pi(kp: f64, ki: f64) -> Self {
        Self::new(kp, ki, 0.0)
    }
}

/// PID controller internal state
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PidState {
    /// Accumulated integral term
    pub integral: f64,
    /// Previous error for derivative calculation
    pub prev_error: f64,
}

/// PID controller
///
/// # Example
/// ```
/// use upright_core::control::{Pid, PidConfig};
///
/// let config = PidConfig::new(200.0, 5.0, 8.0).with_integral_limit(500.0);
/// let mut pid = Pid::new(config);
///
/// // In a control loop
/// let setpoint = 0.0;
/// let measurement = -1.2;
/// let dt = 0.01; // 100 Hz
///
/// let output = pid.update(setpoint, measurement, dt);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Pid {
    config: PidConfig,
    state: PidState,
}

impl Pid {
    /// Create a new PID controller with the given configuration
    pub fn new(config: PidConfig) -> Self {
        Self {
            config,
            state: PidState::default(),
        }
    }

    /// Create a simple P controller
    pub fn p(kp: f64) -> Self {
        Self::new(PidConfig::p(kp))
    }

    /// Create a PI controller
    pub fn pi(kp: f64, ki: f64) -> Self {
        Self::new(PidConfig::pi(kp, ki))
    }

    /// Update the PID controller with a new measurement
    ///
    /// # Arguments
    /// * `setpoint` - Desired value
    /// * `measurement` - Current measured value
    /// * `dt` - Time step in seconds
    #[inline]
    pub fn update(&mut self, setpoint: f64, measurement: f64, dt: f64) -> f64 {
        let error = setpoint - measurement;
        self.update_error(error, dt)
    }

    /// Update the PID controller with a pre-computed error
    ///
    /// A non-positive `dt` skips the integral and derivative terms instead
    /// of dividing by it; two calls in the same counter tick still produce
    /// a finite proportional response.
    #[inline]
    pub fn update_error(&mut self, error: f64, dt: f64) -> f64 {
        // Proportional term
        let p_term = self.config.kp * error;

        // Integral term with windup protection (FMA)
        if dt > 0.0 {
            self.state.integral = error.mul_add(dt, self.state.integral).clamp(
                -self.config.integral_limit,
                self.config.integral_limit,
            );
        }
        let i_term = self.config.ki * self.state.integral;

        // Raw derivative, skipped when no time has passed
        let d_term = if dt > 0.0 {
            self.config.kd * (error - self.state.prev_error) / dt
        } else {
            0.0
        };

        self.state.prev_error = error;
        p_term + i_term + d_term
    }

    /// Reset the controller state
    pub fn reset(&mut self) {
        self.state = PidState::default();
    }

    /// Clear only the integral accumulator; the previous error is kept
    pub fn reset_integral(&mut self) {
        self.state.integral = 0.0;
    }

    /// Get the current state
    pub fn state(&self) -> &PidState {
        &self.state
    }

    /// Get the configuration
    pub fn config(&self) -> &PidConfig {
        &self.config
    }

    /// Set the gains, keeping the accumulated state
    pub fn set_gains(&mut self, kp: f64, ki: f64, kd: f64) {
        self.config.kp = kp;
        self.config.ki = ki;
        self.config.kd = kd;
    }
}
