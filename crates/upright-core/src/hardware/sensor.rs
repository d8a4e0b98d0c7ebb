//! Tilt sensor boundary
//!
//! The inertial unit and its fusion filter live outside this crate. The
//! control loop only needs a refreshed signed tilt in degrees once per PID
//! interval, so the boundary is a two-method trait.

use std::sync::Arc;

use parking_lot::RwLock;

/// Source of the chassis tilt angle
pub trait TiltSensor {
    /// Refresh the reading. Called once per PID interval, before
    /// [`tilt_degrees`](Self::tilt_degrees).
    fn update(&mut self);

    /// Latest signed tilt in degrees; zero is upright
    fn tilt_degrees(&self) -> f64;
}

/// Tilt value shared between a producer and the control loop
///
/// The producer side (a sensor driver thread, or the physics model in
/// simulation) writes through one clone while the control loop reads
/// through another. Single value, latest write wins.
#[derive(Debug, Clone, Default)]
pub struct SharedTilt {
    degrees: Arc<RwLock<f64>>,
}

impl SharedTilt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a new tilt reading, degrees
    pub fn set_degrees(&self, degrees: f64) {
        *self.degrees.write() = degrees;
    }

    /// Read the current value without going through the trait
    pub fn degrees(&self) -> f64 {
        *self.degrees.read()
    }
}

impl TiltSensor for SharedTilt {
    fn update(&mut self) {
        // values are pushed by the producer; nothing to poll
    }

    fn tilt_degrees(&self) -> f64 {
        *self.degrees.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_clones_share_the_value() {
        let producer = SharedTilt::new();
        let mut consumer = producer.clone();

        producer.set_degrees(-12.5);
        consumer.update();
        assert_relative_eq!(consumer.tilt_degrees(), -12.5);
    }

    #[test]
    fn test_latest_write_wins() {
        let tilt = SharedTilt::new();
        tilt.set_degrees(3.0);
        tilt.set_degrees(4.5);
        assert_relative_eq!(tilt.degrees(), 4.5);
    }
}
