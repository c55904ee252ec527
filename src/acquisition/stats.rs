// src/acquisition/stats.rs
//! Producer counters readable from any thread

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free acquisition counters
#[derive(Debug, Default)]
pub struct AcquisitionStats {
    samples_published: AtomicU64,
    framing_faults: AtomicU64,
    io_faults: AtomicU64,
    reconnect_attempts: AtomicU64,
    reconnect_successes: AtomicU64,
}

/// Point-in-time copy of [`AcquisitionStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub samples_published: u64,
    pub framing_faults: u64,
    pub io_faults: u64,
    pub reconnect_attempts: u64,
    pub reconnect_successes: u64,
}

impl AcquisitionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sample(&self) {
        self.samples_published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_framing_fault(&self) {
        self.framing_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_io_fault(&self) {
        self.io_faults.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect_attempt(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect_success(&self) {
        self.reconnect_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            samples_published: self.samples_published.load(Ordering::Relaxed),
            framing_faults: self.framing_faults.load(Ordering::Relaxed),
            io_faults: self.io_faults.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            reconnect_successes: self.reconnect_successes.load(Ordering::Relaxed),
        }
    }
}

impl StatsSnapshot {
    pub fn total_faults(&self) -> u64 {
        self.framing_faults + self.io_faults
    }
}
