//! Digital filters for signal smoothing
//!
//! The balance cascade uses a single first-order low-pass to turn the raw
//! commanded wheel speed into the smoothed estimate the outer loop tracks.

use serde::{Deserialize, Serialize};

/// Trait for digital filters
pub trait Filter: Send + Sync {
    /// Update the filter with a new value and return the filtered output
    fn update(&mut self, value: f64) -> f64;

    /// Reset the filter state
    fn reset(&mut self);

    /// Get the current filtered value without updating
    fn value(&self) -> f64;
}

/// First-order low-pass filter (exponential moving average)
///
/// `alpha` is the weight of the incoming sample; lower values smooth harder.
/// State starts at zero, so the output ramps in from zero rather than
/// jumping to the first sample.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowPassFilter {
    /// Current filtered value
    value: f64,
    /// Filter coefficient (0-1). Lower = more smoothing.
    alpha: f64,
    /// Precomputed 1.0 - alpha
    one_minus_alpha: f64,
}

impl LowPassFilter {
    /// Create a new low-pass filter with the given alpha coefficient
    ///
    /// # Panics
    /// Panics if alpha is not in range [0, 1]
    pub fn new(alpha: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&alpha),
            "Alpha must be between 0 and 1"
        );
        Self {
            value: 0.0,
            alpha,
            one_minus_alpha: 1.0 - alpha,
        }
    }

    /// Get the alpha coefficient
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl Filter for LowPassFilter {
    #[inline]
    fn update(&mut self, value: f64) -> f64 {
        self.value = self.alpha.mul_add(value, self.one_minus_alpha * self.value);
        self.value
    }

    #[inline]
    fn reset(&mut self) {
        self.value = 0.0;
    }

    #[inline]
    fn value(&self) -> f64 {
        self.value
    }
}

impl Default for LowPassFilter {
    fn default() -> Self {
        Self::new(0.1)
    }
}
