//! Small numeric helpers for the control path
//!
//! Just the pieces the balance loop needs: a low-pass filter for the speed
//! estimate and linear range mapping for the steer scalar.

mod filter;

pub use filter::{Filter, LowPassFilter};

/// Map `x` linearly from `[in_min, in_max]` to `[out_min, out_max]`.
///
/// No clamping: inputs outside the source range extrapolate. Callers clamp
/// their inputs first when that matters.
#[inline]
pub fn map_range(x: f64, in_min: f64, in_max: f64, out_min: f64, out_max: f64) -> f64 {
    (x - in_min) * (out_max - out_min) / (in_max - in_min) + out_min
}
