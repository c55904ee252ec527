// src/hal/traits.rs
//! Core HAL traits for link abstraction
//!
//! The acquisition engine only talks to these traits, so a scripted fake link can
//! stand in for real hardware.

use crate::config::LinkConfig;
use crate::hal::serial_driver::LinkError;
use crate::hal::types::LinkState;

/// Byte-level primitives of an opened link
pub trait SerialTransport: Send {
    /// Port identifier this link was opened with (device path, no description)
    fn port_name(&self) -> &str;

    fn state(&self) -> LinkState;

    /// Read up to `len` bytes, waiting at most the configured read timeout.
    ///
    /// A short result is not an error; callers must check the length.
    fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, LinkError>;

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError>;

    fn flush(&mut self) -> Result<(), LinkError>;

    /// Discard anything pending in the OS input and output buffers
    fn reset_buffers(&mut self) -> Result<(), LinkError>;

    /// Best-effort close; never fails
    fn close(&mut self);

    /// Write a single command byte and flush it out
    fn send_command(&mut self, command: u8) -> Result<(), LinkError> {
        self.write(&[command])?;
        self.flush()
    }
}

/// Opens links by port identifier
pub trait LinkConnector: Send {
    type Link: SerialTransport + 'static;

    fn open(&self, port_identifier: &str, config: &LinkConfig) -> Result<Self::Link, LinkError>;
}
