//! Drive commands and the boundary they cross
//!
//! A command is a coarse nine-way direction plus speed and steer scalars,
//! the shape a gamepad-style remote produces. A transport layer writes the
//! newest command into a [`CommandCell`]; the control loop copies it once
//! per PID interval. Latest value wins, nothing is queued.

mod cell;

pub use cell::CommandCell;

use serde::{Deserialize, Serialize};

/// Coarse drive direction from the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Stop,
    Forward,
    Backward,
    Left,
    Right,
    ForwardLeft,
    ForwardRight,
    BackwardLeft,
    BackwardRight,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Stop
    }
}

impl Direction {
    /// Parse a route token. Anything unrecognized maps to `Stop`, so a
    /// garbled remote cannot keep the last motion command alive.
    pub fn parse(value: &str) -> Self {
        match value {
            "forward" => Self::Forward,
            "backward" => Self::Backward,
            "left" => Self::Left,
            "right" => Self::Right,
            "forward_left" => Self::ForwardLeft,
            "forward_right" => Self::ForwardRight,
            "backward_left" => Self::BackwardLeft,
            "backward_right" => Self::BackwardRight,
            _ => Self::Stop,
        }
    }

    /// Map joystick axes to a direction. `v` is forward/backward, `h` is
    /// left/right; only the signs matter, magnitude rides on the speed
    /// scalar.
    pub fn from_axes(v: i8, h: i8) -> Self {
        match (v.signum(), h.signum()) {
            (1, 0) => Self::Forward,
            (1, -1) => Self::ForwardLeft,
            (1, 1) => Self::ForwardRight,
            (-1, 0) => Self::Backward,
            (-1, -1) => Self::BackwardLeft,
            (-1, 1) => Self::BackwardRight,
            (0, -1) => Self::Left,
            (0, 1) => Self::Right,
            _ => Self::Stop,
        }
    }

    /// Signed travel component: +1 for the forward family, -1 for the
    /// backward family, 0 for stop and the pure lateral selectors
    pub fn longitudinal(self) -> i8 {
        match self {
            Self::Forward | Self::ForwardLeft | Self::ForwardRight => 1,
            Self::Backward | Self::BackwardLeft | Self::BackwardRight => -1,
            Self::Stop | Self::Left | Self::Right => 0,
        }
    }
}

/// One remote command: where to go, how fast, how hard to turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriveCommand {
    /// Coarse direction selector
    pub direction: Direction,
    /// Travel speed on a 0-255 scale
    pub speed: u8,
    /// Steer position on a 0-100 scale; 50 is straight ahead
    pub steer: u8,
}

impl Default for DriveCommand {
    fn default() -> Self {
        Self {
            direction: Direction::Stop,
            speed: 150,
            steer: 50,
        }
    }
}

impl DriveCommand {
    /// Build a command; steer is clamped onto its 0-100 scale
    pub fn new(direction: Direction, speed: u8, steer: u8) -> Self {
        Self {
            direction,
            speed,
            steer: steer.min(100),
        }
    }

    /// A stop command at the default speed and steer levels
    pub fn stop() -> Self {
        Self::default()
    }
}

/// Source of the latest drive command
///
/// Read once per control cycle. Implementations must never block; the
/// control loop shares its thread with pulse generation.
pub trait CommandSource {
    /// Copy the most recent command
    fn latest(&self) -> DriveCommand;
}
