//! Actuator port abstraction for stepper drivers
//!
//! A stepper driver exposes three digital lines: step, direction, enable.
//! The pulse generator owns one [`MotorPort`] per motor and treats the
//! lines as plain write-only outputs. Pin numbering and polarity quirks
//! (active-low enables and the like) belong to the implementation.

use serde::{Deserialize, Serialize};

/// Rotation direction latched on a driver's direction line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rotation {
    Forward,
    Backward,
}

impl Default for Rotation {
    fn default() -> Self {
        Self::Forward
    }
}

impl Rotation {
    /// Signed position increment for one completed step pulse
    #[inline]
    pub fn step(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

/// Digital output lines of one stepper driver
///
/// Implementations map these calls onto real pins or record them for
/// tests. Writes must not block: `set_step` is called from the hot loop
/// at up to twice the step rate.
pub trait MotorPort {
    /// Drive the step line high or low
    fn set_step(&mut self, high: bool);

    /// Latch the rotation direction
    fn set_direction(&mut self, direction: Rotation);

    /// Gate the driver stage on or off
    fn set_enabled(&mut self, enabled: bool);
}

/// Port double recording line activity for tests and simulation
#[derive(Debug, Clone, Default)]
pub struct MockPort {
    step_high: bool,
    direction: Rotation,
    enabled: bool,
    rising_edges: u64,
    falling_edges: u64,
}

impl MockPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current level of the step line
    pub fn step_high(&self) -> bool {
        self.step_high
    }

    /// Last latched direction
    pub fn direction(&self) -> Rotation {
        self.direction
    }

    /// Whether the driver stage is gated on
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of low-to-high transitions seen on the step line
    pub fn rising_edges(&self) -> u64 {
        self.rising_edges
    }

    /// Number of high-to-low transitions seen on the step line
    pub fn falling_edges(&self) -> u64 {
        self.falling_edges
    }
}

impl MotorPort for MockPort {
    fn set_step(&mut self, high: bool) {
        if high && !self.step_high {
            self.rising_edges += 1;
        }
        if !high && self.step_high {
            self.falling_edges += 1;
        }
        self.step_high = high;
    }

    fn set_direction(&mut self, direction: Rotation) {
        self.direction = direction;
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_step_sign() {
        assert_eq!(Rotation::Forward.step(), 1);
        assert_eq!(Rotation::Backward.step(), -1);
    }

    #[test]
    fn test_mock_port_counts_edges() {
        let mut port = MockPort::new();

        port.set_step(true);
        port.set_step(true); // level write, not an edge
        port.set_step(false);

        assert_eq!(port.rising_edges(), 1);
        assert_eq!(port.falling_edges(), 1);
        assert!(!port.step_high());
    }

    #[test]
    fn test_mock_port_latches_lines() {
        let mut port = MockPort::new();
        assert_eq!(port.direction(), Rotation::Forward);

        port.set_direction(Rotation::Backward);
        port.set_enabled(true);

        assert_eq!(port.direction(), Rotation::Backward);
        assert!(port.is_enabled());
    }
}
