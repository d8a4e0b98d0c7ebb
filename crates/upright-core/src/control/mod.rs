//! Balance control
//!
//! The cascaded balance controller and the PID primitive underneath it.

mod balance;
mod pid;

pub use balance::{BalanceConfig, BalanceController};
pub use pid::{Pid, PidConfig, PidState};
