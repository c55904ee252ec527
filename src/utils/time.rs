// src/utils/time.rs
//! Timestamps and injectable sleeping
//!
//! Producers never call `thread::sleep` directly; they go through a [`Sleeper`] so
//! fault backoff and reconnect cooldowns can be observed without waiting in tests.

use parking_lot::Mutex;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Blocking delay provider for dependency injection and testing
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

type SleepTrigger = Box<dyn Fn() + Send + Sync>;

/// Records requested delays and returns immediately
#[derive(Default)]
pub struct MockSleeper {
    requested: Mutex<Vec<Duration>>,
    triggers: Mutex<Vec<(Duration, SleepTrigger)>>,
}

impl MockSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `callback` every time a delay of exactly `duration` is requested
    pub fn on_sleep<F>(&self, duration: Duration, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.triggers.lock().push((duration, Box::new(callback)));
    }

    /// Every delay requested so far, in order
    pub fn requested(&self) -> Vec<Duration> {
        self.requested.lock().clone()
    }

    pub fn count_of(&self, duration: Duration) -> usize {
        self.requested.lock().iter().filter(|d| **d == duration).count()
    }

    pub fn total(&self) -> Duration {
        self.requested.lock().iter().sum()
    }

    pub fn clear(&self) {
        self.requested.lock().clear();
    }
}

impl fmt::Debug for MockSleeper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSleeper")
            .field("requested", &*self.requested.lock())
            .field("triggers", &self.triggers.lock().len())
            .finish()
    }
}

impl Sleeper for MockSleeper {
    fn sleep(&self, duration: Duration) {
        self.requested.lock().push(duration);
        for (trigger_duration, callback) in self.triggers.lock().iter() {
            if *trigger_duration == duration {
                callback();
            }
        }
    }
}

pub fn current_timestamp_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
