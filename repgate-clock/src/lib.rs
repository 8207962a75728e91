//! Monotonic clock abstraction.
//!
//! Service durations are measured against a monotonic clock so that
//! wall-clock adjustments cannot skew the connection-quality verdict.
//! A trait seam with mock implementations keeps the timing logic
//! deterministic under test.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Trait for reading monotonic elapsed seconds.
pub trait Clock: Send + Sync {
    /// Seconds elapsed on a monotonic timeline. Only differences between
    /// two readings are meaningful.
    fn now_secs(&self) -> u64;
}

/// Real monotonic clock backed by [`Instant`].
#[derive(Debug)]
pub struct SteadyClock {
    origin: Instant,
}

impl SteadyClock {
    /// Create a clock whose timeline starts now.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SteadyClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SteadyClock {
    fn now_secs(&self) -> u64 {
        self.origin.elapsed().as_secs()
    }
}

/// Mock clock returning a fixed reading.
#[derive(Debug, Clone, Copy)]
pub struct MockClock {
    reading: u64,
}

impl MockClock {
    /// Create a mock clock stuck at `reading` seconds.
    pub fn new(reading: u64) -> Self {
        Self { reading }
    }
}

impl Clock for MockClock {
    fn now_secs(&self) -> u64 {
        self.reading
    }
}

/// Mock clock that advances by a fixed step on each reading.
///
/// Useful for timing a start/stop pair without real delays.
#[derive(Debug)]
pub struct AdvancingClock {
    reading: AtomicU64,
    step: u64,
}

impl AdvancingClock {
    /// Create a clock starting at `reading` and advancing by `step` per call.
    pub fn new(reading: u64, step: u64) -> Self {
        Self {
            reading: AtomicU64::new(reading),
            step,
        }
    }
}

impl Clock for AdvancingClock {
    fn now_secs(&self) -> u64 {
        self.reading.fetch_add(self.step, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clock_returns_fixed_reading() {
        let clock = MockClock::new(42);
        assert_eq!(clock.now_secs(), 42);
        assert_eq!(clock.now_secs(), 42);
    }

    #[test]
    fn test_mock_clock_zero() {
        let clock = MockClock::new(0);
        assert_eq!(clock.now_secs(), 0);
    }

    #[test]
    fn test_advancing_clock_steps() {
        let clock = AdvancingClock::new(100, 310);
        assert_eq!(clock.now_secs(), 100);
        assert_eq!(clock.now_secs(), 410);
        assert_eq!(clock.now_secs(), 720);
    }

    #[test]
    fn test_advancing_clock_zero_step() {
        let clock = AdvancingClock::new(7, 0);
        assert_eq!(clock.now_secs(), 7);
        assert_eq!(clock.now_secs(), 7);
    }

    #[test]
    fn test_steady_clock_is_monotonic() {
        let clock = SteadyClock::new();
        let t1 = clock.now_secs();
        let t2 = clock.now_secs();
        assert!(t2 >= t1);
    }

    #[test]
    fn test_steady_clock_starts_near_zero() {
        let clock = SteadyClock::default();
        assert!(clock.now_secs() < 5);
    }

    #[test]
    fn test_clock_trait_object() {
        let clock: Box<dyn Clock> = Box::new(MockClock::new(9));
        assert_eq!(clock.now_secs(), 9);
    }
}
