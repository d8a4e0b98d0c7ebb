//! Simulation support
//!
//! A crude planar physics stand-in so the whole control stack can run
//! closed loop without hardware: the pendulum produces tilt readings for a
//! [`SharedTilt`](crate::hardware::SharedTilt) and consumes the commanded
//! wheel speed from the orchestrator.

mod pendulum;

pub use pendulum::{InvertedPendulum, PendulumConfig};
