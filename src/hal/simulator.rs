// src/hal/simulator.rs
//! Synthetic sample source for running without hardware
//!
//! Every interval, each arena independently shows either baseline capacitance on
//! both sides or an elevated reading on one side, the signature of an animal on
//! that side of the arena.

use crate::acquisition::channel::SampleSender;
use crate::acquisition::control::{ProducerHandle, RunFlag};
use crate::acquisition::stats::AcquisitionStats;
use crate::config::constants::engine::SYNTHETIC_THREAD_NAME;
use crate::config::constants::synthetic::{
    BASELINE_MAX, BASELINE_MIN, BASELINE_PROBABILITY, ELEVATED_MAX_OFFSET, ELEVATED_MIN_OFFSET,
    RIGHT_ELEVATED_PROBABILITY,
};
use crate::config::SyntheticConfig;
use crate::error::StrobeResult;
use crate::hal::types::{DecodedSample, Reading};
use crate::utils::time::{current_timestamp_nanos, Sleeper, ThreadSleeper};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Which side of an arena, if any, reads elevated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArenaPattern {
    Baseline,
    RightElevated,
    LeftElevated,
}

impl ArenaPattern {
    /// Map a uniform draw in `[0, 1)` to a pattern
    pub fn classify(r: f64) -> Self {
        if r < BASELINE_PROBABILITY {
            ArenaPattern::Baseline
        } else if r < BASELINE_PROBABILITY + RIGHT_ELEVATED_PROBABILITY {
            ArenaPattern::RightElevated
        } else {
            ArenaPattern::LeftElevated
        }
    }
}

/// Random sample generator over any [`Rng`]
pub struct SyntheticGenerator<R: Rng> {
    rng: R,
    channel_count: usize,
    left_threshold: f64,
    right_threshold: f64,
}

impl<R: Rng> SyntheticGenerator<R> {
    pub fn new(rng: R, channel_count: usize, config: &SyntheticConfig) -> Self {
        Self {
            rng,
            channel_count,
            left_threshold: config.left_threshold,
            right_threshold: config.right_threshold,
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Draw one arena's `(pattern, left, right)`
    pub fn draw_arena(&mut self) -> (ArenaPattern, f64, f64) {
        let pattern = ArenaPattern::classify(self.rng.gen::<f64>());
        let (left, right) = match pattern {
            ArenaPattern::Baseline => (self.baseline(), self.baseline()),
            ArenaPattern::RightElevated => (self.baseline(), self.elevated(self.right_threshold)),
            ArenaPattern::LeftElevated => (self.elevated(self.left_threshold), self.baseline()),
        };
        (pattern, left, right)
    }

    /// One unstamped sample with a reading for every arena
    pub fn next_sample(&mut self) -> DecodedSample {
        let mut left = Vec::with_capacity(self.channel_count);
        let mut right = Vec::with_capacity(self.channel_count);

        for _ in 0..self.channel_count {
            let (_, l, r) = self.draw_arena();
            left.push(Reading::Level(l));
            right.push(Reading::Level(r));
        }

        DecodedSample {
            sequence: 0,
            timestamp_nanos: 0,
            left,
            right,
        }
    }

    fn baseline(&mut self) -> f64 {
        self.rng.gen_range(BASELINE_MIN..=BASELINE_MAX)
    }

    fn elevated(&mut self, threshold: f64) -> f64 {
        self.rng
            .gen_range(threshold + ELEVATED_MIN_OFFSET..=threshold + ELEVATED_MAX_OFFSET)
    }
}

/// Producer that publishes generated samples at a fixed interval
pub struct SyntheticSource {
    generator: SyntheticGenerator<StdRng>,
    config: SyntheticConfig,
    sender: SampleSender,
    running: RunFlag,
    stats: Arc<AcquisitionStats>,
    sleeper: Arc<dyn Sleeper>,
    sequence: u64,
}

impl SyntheticSource {
    pub fn new(channel_count: usize, config: SyntheticConfig, sender: SampleSender) -> Self {
        Self::from_rng(StdRng::from_entropy(), channel_count, config, sender)
    }

    /// Reproducible source for tests and demos
    pub fn with_seed(seed: u64, channel_count: usize, config: SyntheticConfig, sender: SampleSender) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed), channel_count, config, sender)
    }

    fn from_rng(rng: StdRng, channel_count: usize, config: SyntheticConfig, sender: SampleSender) -> Self {
        Self {
            generator: SyntheticGenerator::new(rng, channel_count, &config),
            config,
            sender,
            running: RunFlag::new(),
            stats: Arc::new(AcquisitionStats::new()),
            sleeper: Arc::new(ThreadSleeper),
            sequence: 0,
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn run_flag(&self) -> RunFlag {
        self.running.clone()
    }

    pub fn stats(&self) -> Arc<AcquisitionStats> {
        Arc::clone(&self.stats)
    }

    /// Generate and publish one sample. Returns `false` once the consumer is gone.
    pub fn emit(&mut self) -> bool {
        let sample = self
            .generator
            .next_sample()
            .stamped(self.sequence, current_timestamp_nanos());
        self.sequence += 1;

        match self.sender.publish(sample) {
            Ok(()) => {
                self.stats.record_sample();
                true
            }
            Err(_) => {
                debug!("sample consumer gone");
                self.running.request_stop();
                false
            }
        }
    }

    /// Blocking loop; returns once stopped or the consumer is gone
    pub fn run(&mut self) {
        info!(
            channels = self.generator.channel_count(),
            interval_ms = self.config.interval_ms,
            "synthetic source started"
        );

        while self.running.is_running() {
            if !self.emit() {
                break;
            }
            self.sleeper.sleep(self.config.interval());
        }

        info!(samples = self.sequence, "synthetic source stopped");
    }

    pub fn start(mut self) -> StrobeResult<ProducerHandle> {
        let flag = self.running.clone();
        ProducerHandle::spawn(SYNTHETIC_THREAD_NAME, flag, move || self.run())
    }
}
