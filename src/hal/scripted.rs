// src/hal/scripted.rs
//! Scripted link for driving the acquisition engine without hardware
//!
//! Reads are served from a queue shared through a [`ScriptHandle`]; writes, flushes,
//! closes and open attempts are recorded on the same handle so tests can inspect
//! them after the link has moved onto a producer thread.

use crate::config::LinkConfig;
use crate::hal::serial_driver::{parse_port_identifier, LinkError};
use crate::hal::traits::{LinkConnector, SerialTransport};
use crate::hal::types::LinkState;
use crate::protocol::PacketLayout;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

enum ScriptedRead {
    Bytes(Vec<u8>),
    Fail(LinkError),
}

#[derive(Default)]
struct Script {
    reads: VecDeque<ScriptedRead>,
    writes: Vec<Vec<u8>>,
    flushes: usize,
    closes: usize,
    open_attempts: usize,
    failing_opens: usize,
    fail_writes: bool,
    on_exhausted: Option<Box<dyn FnMut() + Send>>,
}

/// Shared script state
#[derive(Clone, Default)]
pub struct ScriptHandle {
    inner: Arc<Mutex<Script>>,
}

impl ScriptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one read result
    pub fn push_bytes(&self, bytes: Vec<u8>) {
        self.inner.lock().reads.push_back(ScriptedRead::Bytes(bytes));
    }

    /// Queue one failing read
    pub fn push_failure(&self, error: LinkError) {
        self.inner.lock().reads.push_back(ScriptedRead::Fail(error));
    }

    pub fn pending_reads(&self) -> usize {
        self.inner.lock().reads.len()
    }

    /// Called every time a read finds the queue empty. The read then returns no
    /// bytes.
    pub fn on_exhausted<F>(&self, callback: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.inner.lock().on_exhausted = Some(Box::new(callback));
    }

    /// Make the next `count` opens fail
    pub fn fail_next_opens(&self, count: usize) {
        self.inner.lock().failing_opens = count;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.inner.lock().fail_writes = fail;
    }

    /// Every successful write, in order
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.inner.lock().writes.clone()
    }

    /// Successful writes flattened into one byte stream
    pub fn commands(&self) -> Vec<u8> {
        self.inner.lock().writes.iter().flatten().copied().collect()
    }

    pub fn flush_count(&self) -> usize {
        self.inner.lock().flushes
    }

    pub fn close_count(&self) -> usize {
        self.inner.lock().closes
    }

    pub fn open_attempts(&self) -> usize {
        self.inner.lock().open_attempts
    }
}

/// Link backed by a [`ScriptHandle`]
pub struct ScriptedLink {
    port_name: String,
    script: ScriptHandle,
    state: LinkState,
}

impl ScriptedLink {
    pub fn new(port_name: &str, script: ScriptHandle) -> Self {
        Self {
            port_name: port_name.to_string(),
            script,
            state: LinkState::Open,
        }
    }
}

impl SerialTransport for ScriptedLink {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn state(&self) -> LinkState {
        self.state
    }

    fn read_exact(&mut self, _len: usize) -> Result<Vec<u8>, LinkError> {
        if self.state == LinkState::Closed {
            return Err(LinkError::NotOpen);
        }

        let mut script = self.script.inner.lock();
        match script.reads.pop_front() {
            Some(ScriptedRead::Bytes(bytes)) => Ok(bytes),
            Some(ScriptedRead::Fail(err)) => Err(err),
            None => {
                if let Some(callback) = script.on_exhausted.as_mut() {
                    callback();
                }
                Ok(Vec::new())
            }
        }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.state == LinkState::Closed {
            return Err(LinkError::NotOpen);
        }

        let mut script = self.script.inner.lock();
        if script.fail_writes {
            return Err(LinkError::IoFailed("scripted write failure".to_string()));
        }
        script.writes.push(bytes.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LinkError> {
        self.script.inner.lock().flushes += 1;
        Ok(())
    }

    fn reset_buffers(&mut self) -> Result<(), LinkError> {
        Ok(())
    }

    fn close(&mut self) {
        if self.state == LinkState::Open {
            self.state = LinkState::Closed;
            self.script.inner.lock().closes += 1;
        }
    }
}

/// Connector whose links all share one script
#[derive(Clone)]
pub struct ScriptedConnector {
    script: ScriptHandle,
}

impl ScriptedConnector {
    pub fn new(script: ScriptHandle) -> Self {
        Self { script }
    }
}

impl LinkConnector for ScriptedConnector {
    type Link = ScriptedLink;

    fn open(&self, port_identifier: &str, _config: &LinkConfig) -> Result<ScriptedLink, LinkError> {
        let device = parse_port_identifier(port_identifier);
        {
            let mut script = self.script.inner.lock();
            script.open_attempts += 1;
            if script.failing_opens > 0 {
                script.failing_opens -= 1;
                return Err(LinkError::OpenFailed {
                    port: device.to_string(),
                    cause: "scripted open failure".to_string(),
                });
            }
        }
        Ok(ScriptedLink::new(device, self.script.clone()))
    }
}

/// Encode `(left, right)` 12-bit counts into a frame the decoder accepts
pub fn build_packet(layout: &PacketLayout, readings: &[(u16, u16)]) -> Vec<u8> {
    let mut bytes = vec![0u8; layout.packet_size()];

    for (channel, &(left, right)) in readings.iter().take(layout.channel_count).enumerate() {
        let base = channel * layout.bytes_per_channel;
        let [left_high, left_low] = (left << 4).to_be_bytes();
        let [right_high, right_low] = (right << 4).to_be_bytes();

        bytes[base + layout.left_high_offset] = left_high;
        bytes[base + layout.left_low_offset] = left_low;
        bytes[base + layout.right_high_offset] = right_high;
        bytes[base + layout.right_low_offset] = right_low;
    }

    bytes
}
