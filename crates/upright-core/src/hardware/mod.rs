//! Hardware boundary: actuator ports, pulse generation, tilt sensing
//!
//! Provides the write-only port abstraction the pulse generators drive and
//! the sensor trait the orchestrator reads. Real pin mappings and the
//! inertial unit live outside this crate; tests and simulation use the
//! shipped doubles.

mod port;
mod sensor;
mod stepper;

pub use port::{MockPort, MotorPort, Rotation};
pub use sensor::{SharedTilt, TiltSensor};
pub use stepper::{StepperConfig, StepperMotor};
