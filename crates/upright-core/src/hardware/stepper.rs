//! Non-blocking step-pulse generation
//!
//! Each motor gets one generator. [`StepperMotor::run`] advances a
//! two-state pulse machine with a single time comparison, so its cost is
//! constant and one cooperative loop can interleave both motors with the
//! balance math. Timing comes from a wrapping 32-bit microsecond counter
//! sampled by the caller.

use serde::{Deserialize, Serialize};

use crate::hardware::port::{MotorPort, Rotation};
use crate::time;
use crate::{Error, Result};

/// Motor speed limits and pulse shape
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StepperConfig {
    /// Slowest reliable step rate in steps/s; nonzero speeds below this
    /// are raised to it
    pub min_speed: f64,
    /// Step rate ceiling in steps/s
    pub max_speed: f64,
    /// High time of each step pulse, microseconds
    pub pulse_width_micros: u32,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            min_speed: 200.0,
            max_speed: 50_000.0,
            pulse_width_micros: 2,
        }
    }
}

impl StepperConfig {
    /// Set the dead zone floor and the ceiling together
    pub fn with_speed_range(mut self, min_speed: f64, max_speed: f64) -> Self {
        self.min_speed = min_speed;
        self.max_speed = max_speed;
        self
    }

    /// Set the pulse high time, microseconds
    pub fn with_pulse_width(mut self, micros: u32) -> Self {
        self.pulse_width_micros = micros;
        self
    }

    /// Check limits and pulse shape
    pub fn validate(&self) -> Result<()> {
        if !(self.min_speed.is_finite() && self.min_speed > 0.0) {
            return Err(Error::Config(format!(
                "minimum step rate must be positive, got {}",
                self.min_speed
            )));
        }
        if !(self.max_speed.is_finite() && self.max_speed >= self.min_speed) {
            return Err(Error::Config(
                "step rate ceiling must be at or above the minimum".into(),
            ));
        }
        if self.pulse_width_micros == 0 {
            return Err(Error::Config("pulse width must be nonzero".into()));
        }
        Ok(())
    }
}

/// Pulse machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PulseState {
    /// Step line low, waiting for the next interval to elapse
    Idle,
    /// Step line high since the recorded microsecond count
    High { since_micros: u32 },
}

/// Step-pulse generator for one stepper driver
///
/// Owns its [`MotorPort`] and a signed position counter. The counter moves
/// only on the falling edge of a pulse, so an aborted pulse is never
/// counted as travel.
#[derive(Debug)]
pub struct StepperMotor<P: MotorPort> {
    port: P,
    config: StepperConfig,
    enabled: bool,
    direction: Rotation,
    speed: f64,
    step_interval_micros: u32,
    pulse: PulseState,
    last_step_micros: u32,
    position: i64,
}

impl<P: MotorPort> StepperMotor<P> {
    /// Create a generator with the default limits
    pub fn new(port: P) -> Self {
        Self::build(port, StepperConfig::default())
    }

    /// Create a generator with explicit limits
    pub fn with_config(port: P, config: StepperConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(port, config))
    }

    fn build(port: P, config: StepperConfig) -> Self {
        Self {
            port,
            config,
            enabled: false,
            direction: Rotation::Forward,
            speed: 0.0,
            step_interval_micros: 0,
            pulse: PulseState::Idle,
            last_step_micros: 0,
            position: 0,
        }
    }

    /// Drive all lines to a safe idle: step low, direction forward, driver
    /// stage gated off
    pub fn begin(&mut self) {
        self.port.set_step(false);
        self.port.set_direction(Rotation::Forward);
        self.port.set_enabled(false);
        self.direction = Rotation::Forward;
        self.enabled = false;
        self.pulse = PulseState::Idle;
    }

    /// Gate the driver stage on or off
    pub fn set_motor_enable(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.port.set_enabled(enabled);
    }

    /// Set the step rate from a signed or unsigned speed
    ///
    /// Only the magnitude matters; use [`set_direction`](Self::set_direction)
    /// for the sign. Nonzero magnitudes below the dead zone floor are
    /// raised to it, the ceiling caps the rate, and zero stops stepping
    /// entirely.
    pub fn set_speed(&mut self, speed: f64) {
        let magnitude = speed.abs();
        self.speed = if magnitude == 0.0 {
            0.0
        } else {
            magnitude.clamp(self.config.min_speed, self.config.max_speed)
        };
        self.step_interval_micros = if self.speed == 0.0 {
            0
        } else {
            (1_000_000.0 / self.speed) as u32
        };
    }

    /// Latch the rotation direction on the port immediately
    ///
    /// An in-flight pulse finishes under the new direction; the counter
    /// credits whichever direction is latched when the pulse completes.
    pub fn set_direction(&mut self, direction: Rotation) {
        self.direction = direction;
        self.port.set_direction(direction);
    }

    /// Advance the pulse machine against the wrapping microsecond counter
    ///
    /// Call as often as possible; each call does at most one comparison and
    /// one line write. While stepping is gated off (driver disabled or zero
    /// speed) the machine idles and an in-flight pulse is released low
    /// without counting travel.
    pub fn run(&mut self, now_micros: u32) {
        if !self.enabled || self.step_interval_micros == 0 {
            if matches!(self.pulse, PulseState::High { .. }) {
                self.port.set_step(false);
            }
            self.pulse = PulseState::Idle;
            return;
        }

        match self.pulse {
            PulseState::Idle => {
                if time::elapsed(now_micros, self.last_step_micros) >= self.step_interval_micros {
                    self.port.set_step(true);
                    self.pulse = PulseState::High { since_micros: now_micros };
                    self.last_step_micros = now_micros;
                }
            }
            PulseState::High { since_micros } => {
                if time::elapsed(now_micros, since_micros) >= self.config.pulse_width_micros {
                    self.port.set_step(false);
                    self.pulse = PulseState::Idle;
                    self.position += self.direction.step();
                }
            }
        }
    }

    /// Effective step rate after dead zone and ceiling, steps/s
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Current step interval, microseconds; zero while stopped
    pub fn step_interval_micros(&self) -> u32 {
        self.step_interval_micros
    }

    /// Net signed steps since the last reset
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Zero the position counter
    pub fn reset_position(&mut self) {
        self.position = 0;
    }

    /// Last latched direction
    pub fn direction(&self) -> Rotation {
        self.direction
    }

    /// Whether the driver stage is gated on
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The owned port, for inspection
    pub fn port(&self) -> &P {
        &self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::port::MockPort;
    use approx::assert_relative_eq;

    fn running_motor(speed: f64) -> StepperMotor<MockPort> {
        let mut motor = StepperMotor::new(MockPort::new());
        motor.begin();
        motor.set_motor_enable(true);
        motor.set_speed(speed);
        motor
    }

    #[test]
    fn test_begin_forces_safe_idle() {
        let mut motor = StepperMotor::new(MockPort::new());
        motor.begin();

        assert!(!motor.is_enabled());
        assert!(!motor.port().step_high());
        assert_eq!(motor.port().direction(), Rotation::Forward);
        assert!(!motor.port().is_enabled());
    }

    #[test]
    fn test_dead_zone_floor() {
        let mut motor = StepperMotor::new(MockPort::new());

        // anything in (0, 200) lands exactly on the floor
        motor.set_speed(100.0);
        assert_relative_eq!(motor.speed(), 200.0);
        assert_eq!(motor.step_interval_micros(), 5_000);

        motor.set_speed(0.5);
        assert_relative_eq!(motor.speed(), 200.0);
        assert_eq!(motor.step_interval_micros(), 5_000);

        motor.set_speed(199.9);
        assert_eq!(motor.step_interval_micros(), 5_000);
    }

    #[test]
    fn test_speed_ceiling() {
        let mut motor = StepperMotor::new(MockPort::new());
        motor.set_speed(60_000.0);
        assert_relative_eq!(motor.speed(), 50_000.0);
        assert_eq!(motor.step_interval_micros(), 20);
    }

    #[test]
    fn test_zero_speed_disables_stepping() {
        let mut motor = StepperMotor::new(MockPort::new());
        motor.set_speed(1_000.0);
        motor.set_speed(0.0);
        assert_relative_eq!(motor.speed(), 0.0);
        assert_eq!(motor.step_interval_micros(), 0);
    }

    #[test]
    fn test_negative_speed_uses_magnitude() {
        let mut motor = StepperMotor::new(MockPort::new());
        motor.set_speed(-300.0);
        assert_relative_eq!(motor.speed(), 300.0);
        assert_eq!(motor.step_interval_micros(), 3_333);
    }

    #[test]
    fn test_pulse_cycle_at_1khz() {
        let mut motor = running_motor(1_000.0);

        // interval 1000 us has not elapsed yet
        motor.run(999);
        assert!(!motor.port().step_high());
        assert_eq!(motor.position(), 0);

        // rising edge
        motor.run(1_000);
        assert!(motor.port().step_high());
        assert_eq!(motor.position(), 0);

        // 1 us into a 2 us pulse
        motor.run(1_001);
        assert!(motor.port().step_high());

        // falling edge counts the step
        motor.run(1_002);
        assert!(!motor.port().step_high());
        assert_eq!(motor.position(), 1);

        // next interval measured from the rising edge
        motor.run(1_999);
        assert!(!motor.port().step_high());
        motor.run(2_000);
        assert!(motor.port().step_high());
    }

    #[test]
    fn test_backward_counts_down() {
        let mut motor = running_motor(1_000.0);
        motor.set_direction(Rotation::Backward);
        assert_eq!(motor.port().direction(), Rotation::Backward);

        motor.run(1_000);
        motor.run(1_002);
        assert_eq!(motor.position(), -1);
    }

    #[test]
    fn test_disabled_motor_never_pulses() {
        let mut motor = StepperMotor::new(MockPort::new());
        motor.begin();
        motor.set_speed(1_000.0);

        for now in (0..50_000).step_by(500) {
            motor.run(now);
        }
        assert_eq!(motor.port().rising_edges(), 0);
        assert_eq!(motor.position(), 0);
    }

    #[test]
    fn test_disable_mid_pulse_releases_line() {
        let mut motor = running_motor(1_000.0);

        motor.run(1_000);
        assert!(motor.port().step_high());

        motor.set_motor_enable(false);
        motor.run(1_001);
        assert!(!motor.port().step_high());
        // the aborted pulse is not counted as travel
        assert_eq!(motor.position(), 0);

        // re-enabled stepping picks up cleanly
        motor.set_motor_enable(true);
        motor.run(2_000);
        assert!(motor.port().step_high());
        motor.run(2_002);
        assert_eq!(motor.position(), 1);
    }

    #[test]
    fn test_zero_speed_mid_pulse_releases_line() {
        let mut motor = running_motor(1_000.0);
        motor.run(1_000);
        assert!(motor.port().step_high());

        motor.set_speed(0.0);
        motor.run(1_001);
        assert!(!motor.port().step_high());
        assert_eq!(motor.position(), 0);
    }

    #[test]
    fn test_pulse_spans_counter_wraparound() {
        let mut motor = running_motor(1_000.0);

        // last_step starts at 0; far in the "past" relative to this call,
        // so the machine rises immediately
        motor.run(u32::MAX);
        assert!(motor.port().step_high());

        // 1 us after the wrap: pulse still high
        motor.run(0);
        assert!(motor.port().step_high());

        // 2 us elapsed across the wrap: falling edge, step counted
        motor.run(1);
        assert!(!motor.port().step_high());
        assert_eq!(motor.position(), 1);

        // interval arithmetic also wraps: 1000 us after the rise at MAX
        motor.run(999);
        assert!(motor.port().step_high());
    }

    #[test]
    fn test_position_reset() {
        let mut motor = running_motor(1_000.0);
        motor.run(1_000);
        motor.run(1_002);
        assert_eq!(motor.position(), 1);

        motor.reset_position();
        assert_eq!(motor.position(), 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let zero_floor = StepperConfig::default().with_speed_range(0.0, 50_000.0);
        assert!(StepperMotor::with_config(MockPort::new(), zero_floor).is_err());

        let inverted = StepperConfig::default().with_speed_range(500.0, 100.0);
        assert!(StepperMotor::with_config(MockPort::new(), inverted).is_err());

        let no_pulse = StepperConfig::default().with_pulse_width(0);
        assert!(StepperMotor::with_config(MockPort::new(), no_pulse).is_err());
    }
}
