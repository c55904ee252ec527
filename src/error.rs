// src/error.rs
//! Unified error type for the STROBE core
//!
//! Component errors convert into [`StrobeError`] with `?`. Faults inside a running
//! producer never reach this type; they are counted and retried on the producer
//! thread.

use crate::config::ConfigError;
use crate::hal::serial_driver::LinkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrobeError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to spawn {name} thread: {source}")]
    ThreadSpawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} thread panicked")]
    ProducerPanicked(String),
}

/// Result type alias for STROBE operations
pub type StrobeResult<T> = Result<T, StrobeError>;
