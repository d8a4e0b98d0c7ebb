//! upright-core: control core for a two-wheeled self-balancing robot
//!
//! Everything needed to keep a stepper-driven inverted pendulum on its
//! wheels: a cascaded PID balance controller, non-blocking step-pulse
//! generators, and an orchestrator that ties tilt sensing, fall safety,
//! and differential steering together on a fixed cadence.
//!
//! # Modules
//!
//! - [`control`] - Cascaded balance controller and the PID primitive
//! - [`hardware`] - Actuator ports, pulse generators, tilt sensing
//! - [`command`] - Drive commands and the latest-value command cell
//! - [`robot`] - Orchestrator wiring everything to one cooperative loop
//! - [`sim`] - Inverted-pendulum model for closed-loop runs off hardware
//! - [`math`] - Filters and small numeric helpers
//! - [`time`] - Wrapping-counter clock abstraction
//!
//! # Architecture
//!
//! ```text
//! network layer ──► CommandCell ──┐
//!                                 ▼
//! TiltSensor ────────────► Robot::run ◄── Clock
//!                               │
//!                       BalanceController
//!                               │ base speed ± steer
//!                   ┌───────────┴───────────┐
//!                   ▼                       ▼
//!          StepperMotor(left)      StepperMotor(right)
//!                   │                       │
//!                   ▼                       ▼
//!               MotorPort               MotorPort
//! ```
//!
//! [`Robot::run`] is built for a single cooperative loop called as fast as
//! possible: pulse timing is serviced on every call, the balance math runs
//! on its own 10 ms cadence.

#![warn(unused_must_use)]

pub mod command;
pub mod control;
pub mod hardware;
pub mod math;
pub mod robot;
pub mod sim;
pub mod time;

// Re-exports for convenience
pub use command::{CommandCell, CommandSource, Direction, DriveCommand};
pub use control::{BalanceConfig, BalanceController, Pid, PidConfig};
pub use hardware::{MockPort, MotorPort, Rotation, SharedTilt, StepperConfig, StepperMotor, TiltSensor};
pub use robot::{Robot, RobotConfig, RobotStatus};
pub use sim::{InvertedPendulum, PendulumConfig};
pub use time::{Clock, ManualClock, MonotonicClock};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error types for upright-core
///
/// Configuration is rejected up front, when a component is built. The
/// control path itself never returns errors: out-of-range inputs are
/// clamped and faults are latched, so `run` stays infallible.
#[derive(Debug, thiserror::Error)]
#[must_use = "errors must be handled or explicitly ignored with let _ = ..."]
#[non_exhaustive]
pub enum Error {
    /// Invalid configuration parameter.
    /// Handle by: validating config before use, checking parameter ranges.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Hardware-level error from a port or sensor implementation.
    /// Handle by: checking wiring and permissions, ensuring a safe state before retry.
    #[error("Hardware error: {0}")]
    Hardware(String),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Hardware(format!("I/O error: {}", e))
    }
}

/// Result type alias for upright-core operations
pub type Result<T> = std::result::Result<T, Error>;
