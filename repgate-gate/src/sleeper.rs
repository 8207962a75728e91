//! Sleep abstraction for testable delays.
//!
//! The gate's whole purpose is to sleep; a `Sleeper` trait keeps the delay
//! logic testable without real waits.

use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Trait for blocking delays.
pub trait Sleeper: Send + Sync {
    /// Block for the given number of seconds.
    fn sleep_secs(&self, seconds: u64);
}

/// Real sleeper backed by `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealSleeper;

impl RealSleeper {
    /// Create a new real sleeper.
    pub fn new() -> Self {
        Self
    }
}

impl Sleeper for RealSleeper {
    fn sleep_secs(&self, seconds: u64) {
        std::thread::sleep(Duration::from_secs(seconds));
    }
}

/// Test sleeper that returns immediately and records each requested delay.
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<u64>>>,
}

impl RecordingSleeper {
    /// Create a new recording sleeper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays requested so far, in order.
    pub fn slept(&self) -> Vec<u64> {
        self.slept.lock().unwrap().clone()
    }

    /// Sum of all requested delays.
    pub fn total_secs(&self) -> u64 {
        self.slept.lock().unwrap().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep_secs(&self, seconds: u64) {
        self.slept.lock().unwrap().push(seconds);
    }
}
