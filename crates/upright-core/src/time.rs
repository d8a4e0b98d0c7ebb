//! Clock abstraction for the control loops
//!
//! Timing follows the counters the controllers are written against: a
//! wrapping 32-bit microsecond count for pulse generation and a wrapping
//! 32-bit millisecond count for the PID cadences. Elapsed time is always
//! computed with [`elapsed`], which stays correct across a counter overflow.
//!
//! Components never sample a clock themselves; they take the current count
//! as an argument, so tests drive time explicitly. Only the orchestrator
//! and the outer application loop hold a [`Clock`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of the wrapping microsecond and millisecond counters.
pub trait Clock: Send + Sync {
    /// Current microsecond count. Wraps at `u32::MAX` (about 71 minutes).
    fn now_micros(&self) -> u32;

    /// Current millisecond count. Wraps at `u32::MAX` (about 49 days).
    fn now_millis(&self) -> u32;
}

/// Elapsed ticks from `last` to `now` on a wrapping counter.
#[inline]
pub fn elapsed(now: u32, last: u32) -> u32 {
    now.wrapping_sub(last)
}

/// Wall-clock backed [`Clock`] counting from construction.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_micros(&self) -> u32 {
        self.start.elapsed().as_micros() as u32
    }

    fn now_millis(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}

/// Manually advanced [`Clock`] for tests and simulation.
///
/// Clones share the same counter, so a test holds one handle and advances
/// time while the component under test reads through another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the counter at an arbitrary microsecond count. Wraparound tests
    /// start just below `u32::MAX`.
    pub fn starting_at_micros(micros: u64) -> Self {
        Self { micros: Arc::new(AtomicU64::new(micros)) }
    }

    /// Advance the counter by `micros` microseconds.
    pub fn advance_micros(&self, micros: u64) {
        self.micros.fetch_add(micros, Ordering::Relaxed);
    }

    /// Advance the counter by `millis` milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance_micros(millis * 1_000);
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> u32 {
        self.micros.load(Ordering::Relaxed) as u32
    }

    fn now_millis(&self) -> u32 {
        (self.micros.load(Ordering::Relaxed) / 1_000) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_simple() {
        assert_eq!(elapsed(1_500, 1_000), 500);
        assert_eq!(elapsed(1_000, 1_000), 0);
    }

    #[test]
    fn test_elapsed_across_wraparound() {
        // one tick from u32::MAX lands on 0, the next on 1
        assert_eq!(elapsed(1, u32::MAX), 2);
        assert_eq!(elapsed(0, u32::MAX), 1);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::new();
        assert_eq!(clock.now_micros(), 0);
        assert_eq!(clock.now_millis(), 0);

        clock.advance_micros(1_500);
        assert_eq!(clock.now_micros(), 1_500);
        assert_eq!(clock.now_millis(), 1);

        clock.advance_millis(10);
        assert_eq!(clock.now_micros(), 11_500);
        assert_eq!(clock.now_millis(), 11);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance_millis(25);
        assert_eq!(clock.now_millis(), 25);
    }

    #[test]
    fn test_manual_clock_micros_wrap() {
        let clock = ManualClock::starting_at_micros(u64::from(u32::MAX) - 1);
        assert_eq!(clock.now_micros(), u32::MAX - 1);

        clock.advance_micros(3);
        assert_eq!(clock.now_micros(), 1);
    }

    #[test]
    fn test_monotonic_clock_moves_forward() {
        let clock = MonotonicClock::new();
        let first = clock.now_micros();
        let second = clock.now_micros();
        assert!(second >= first);
    }
}
