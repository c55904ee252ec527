// src/acquisition/engine.rs
//! Hardware acquisition engine
//!
//! Owns the serial link on a dedicated producer thread, frames and decodes fixed
//! size packets, publishes them to the sample channel, and recovers from faults by
//! reconnecting. No fault is fatal: a missing device shows up as a continuous
//! reconnect cycle until a stop is requested.

use crate::acquisition::channel::SampleSender;
use crate::acquisition::control::{ProducerHandle, RunFlag};
use crate::acquisition::stats::AcquisitionStats;
use crate::config::constants::engine::ACQUISITION_THREAD_NAME;
use crate::config::{ConfigError, EngineConfig, LinkConfig};
use crate::error::StrobeResult;
use crate::hal::serial_driver::LinkError;
use crate::hal::traits::{LinkConnector, SerialTransport};
use crate::protocol::{FramingError, PacketDecoder};
use crate::utils::time::{current_timestamp_nanos, Sleeper, ThreadSleeper};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Lifecycle phase, only ever changed by the producer thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnginePhase {
    Idle,
    Starting,
    Reading,
    Faulting,
    Reconnecting,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineState {
    pub phase: EnginePhase,
    pub consecutive_errors: u32,
    pub max_errors: u32,
}

impl EngineState {
    fn new(max_errors: u32) -> Self {
        Self {
            phase: EnginePhase::Idle,
            consecutive_errors: 0,
            max_errors,
        }
    }

    pub fn threshold_reached(&self) -> bool {
        self.consecutive_errors >= self.max_errors
    }
}

/// A failed read cycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionFault {
    #[error("framing fault: expected {expected} bytes, got {actual}")]
    Framing { expected: usize, actual: usize },

    #[error("I/O fault: {0}")]
    Io(LinkError),
}

impl From<FramingError> for AcquisitionFault {
    fn from(err: FramingError) -> Self {
        AcquisitionFault::Framing {
            expected: err.expected,
            actual: err.actual,
        }
    }
}

/// What a single read cycle did
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Published,
    Fault(AcquisitionFault),
    ConsumerGone,
}

pub struct AcquisitionEngine<C: LinkConnector> {
    connector: C,
    port_identifier: String,
    link: Option<C::Link>,
    decoder: PacketDecoder,
    link_config: Arc<LinkConfig>,
    engine_config: EngineConfig,
    state: EngineState,
    sender: SampleSender,
    running: RunFlag,
    stats: Arc<AcquisitionStats>,
    sleeper: Arc<dyn Sleeper>,
    sequence: u64,
}

impl<C: LinkConnector> AcquisitionEngine<C> {
    /// Open `port_identifier` through `connector` and build an idle engine.
    ///
    /// The packet geometry is validated before the port is touched. Open failures
    /// are returned to the caller; once running, the engine never surfaces link
    /// errors again.
    pub fn connect(
        connector: C,
        port_identifier: &str,
        link_config: Arc<LinkConfig>,
        engine_config: EngineConfig,
        sender: SampleSender,
    ) -> StrobeResult<Self> {
        link_config.validate().map_err(ConfigError::Invalid)?;
        let link = connector.open(port_identifier, &link_config)?;
        info!(port = %link.port_name(), "acquisition link opened");

        Ok(Self {
            connector,
            port_identifier: port_identifier.to_string(),
            link: Some(link),
            decoder: PacketDecoder::new(&link_config),
            state: EngineState::new(engine_config.max_errors),
            link_config,
            engine_config,
            sender,
            running: RunFlag::new(),
            stats: Arc::new(AcquisitionStats::new()),
            sleeper: Arc::new(ThreadSleeper),
            sequence: 0,
        })
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

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn port_identifier(&self) -> &str {
        &self.port_identifier
    }

    pub fn is_link_open(&self) -> bool {
        self.link.is_some()
    }

    /// Run the acquisition loop on its own thread
    pub fn start(mut self) -> StrobeResult<ProducerHandle>
    where
        C: 'static,
    {
        let flag = self.running.clone();
        ProducerHandle::spawn(ACQUISITION_THREAD_NAME, flag, move || self.run())
    }

    /// Blocking acquisition loop; returns once stopped
    pub fn run(&mut self) {
        self.begin_streaming();

        while self.running.is_running() {
            if self.step() == StepOutcome::ConsumerGone {
                break;
            }
        }

        self.shutdown();
    }

    /// Send the start command and let the device settle
    pub fn begin_streaming(&mut self) {
        self.state.phase = EnginePhase::Starting;
        let command = self.link_config.start_command;

        let result = match self.link.as_mut() {
            Some(link) => link.send_command(command),
            None => Err(LinkError::NotOpen),
        };

        match result {
            Ok(()) => {
                debug!(command, "start command sent");
                self.sleeper.sleep(self.engine_config.settle_delay());
                self.state.phase = EnginePhase::Reading;
            }
            Err(err) => {
                self.handle_fault(AcquisitionFault::Io(err));
            }
        }
    }

    /// One read cycle: read a frame, decode, publish, or handle the fault
    pub fn step(&mut self) -> StepOutcome {
        let expected = self.decoder.packet_size();
        let read = match self.link.as_mut() {
            Some(link) => link.read_exact(expected),
            None => Err(LinkError::NotOpen),
        };

        let bytes = match read {
            Ok(bytes) => bytes,
            Err(err) => return self.handle_fault(AcquisitionFault::Io(err)),
        };

        let raw = match self.decoder.frame(bytes) {
            Ok(raw) => raw,
            Err(err) => return self.handle_fault(err.into()),
        };

        self.state.consecutive_errors = 0;
        self.state.phase = EnginePhase::Reading;

        let sample = self
            .decoder
            .decode(&raw)
            .stamped(self.sequence, current_timestamp_nanos());
        self.sequence += 1;

        match self.sender.publish(sample) {
            Ok(()) => {
                self.stats.record_sample();
                StepOutcome::Published
            }
            Err(closed) => {
                info!(sequence = closed.0.sequence, "sample consumer gone, stopping acquisition");
                self.running.request_stop();
                StepOutcome::ConsumerGone
            }
        }
    }

    fn handle_fault(&mut self, fault: AcquisitionFault) -> StepOutcome {
        self.state.phase = EnginePhase::Faulting;
        self.state.consecutive_errors += 1;

        let is_io = matches!(fault, AcquisitionFault::Io(_));
        if is_io {
            self.stats.record_io_fault();
        } else {
            self.stats.record_framing_fault();
        }
        warn!(
            port = %self.port_identifier,
            errors = self.state.consecutive_errors,
            %fault,
            "acquisition fault"
        );

        if self.state.threshold_reached() {
            self.attempt_reconnect();
        }

        if is_io {
            self.sleeper.sleep(self.engine_config.fault_backoff());
        }

        if self.state.phase == EnginePhase::Faulting {
            self.state.phase = EnginePhase::Reading;
        }
        StepOutcome::Fault(fault)
    }

    /// Close, cool down, reopen and restart the device stream
    fn attempt_reconnect(&mut self) {
        self.state.phase = EnginePhase::Reconnecting;
        self.stats.record_reconnect_attempt();
        info!(
            port = %self.port_identifier,
            errors = self.state.consecutive_errors,
            "too many consecutive faults, reconnecting"
        );

        if let Some(mut link) = self.link.take() {
            link.close();
        }

        self.sleeper.sleep(self.engine_config.reconnect_cooldown());
        if !self.running.is_running() {
            return;
        }

        match self.connector.open(&self.port_identifier, &self.link_config) {
            Ok(mut link) => {
                if let Err(err) = link.send_command(self.link_config.start_command) {
                    warn!(port = %self.port_identifier, %err, "start command failed after reconnect");
                }
                self.link = Some(link);
                self.state.consecutive_errors = 0;
                self.stats.record_reconnect_success();
                info!(port = %self.port_identifier, "reconnected");
            }
            Err(err) => {
                self.state.consecutive_errors = self.engine_config.retry_error_count();
                error!(port = %self.port_identifier, %err, "reconnect failed");
            }
        }

        self.state.phase = EnginePhase::Reading;
    }

    /// Request a stop, send the stop command and close the link. Errors are
    /// ignored and repeated calls do nothing. An engine that never started
    /// streaming only closes the link.
    pub fn shutdown(&mut self) {
        if self.state.phase == EnginePhase::Stopped {
            return;
        }
        self.running.request_stop();

        let streaming = self.state.phase != EnginePhase::Idle;
        if let Some(mut link) = self.link.take() {
            if streaming {
                if let Err(err) = link.send_command(self.link_config.stop_command) {
                    debug!(%err, "stop command failed, ignored");
                }
            }
            link.close();
        }

        self.state.phase = EnginePhase::Stopped;
        info!(port = %self.port_identifier, samples = self.sequence, "acquisition stopped");
    }
}

impl<C: LinkConnector> Drop for AcquisitionEngine<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
