// src/acquisition/mod.rs
//! Producers, their control handles and the sample hand-off channel

pub mod channel;
pub mod control;
pub mod engine;
pub mod stats;

pub use channel::{ChannelClosed, SampleChannel, SampleReceiver, SampleSender};
pub use control::{ProducerHandle, RunFlag};
pub use engine::{AcquisitionEngine, AcquisitionFault, EnginePhase, EngineState, StepOutcome};
pub use stats::{AcquisitionStats, StatsSnapshot};
