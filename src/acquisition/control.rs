// src/acquisition/control.rs
//! Cooperative stop signalling and producer thread ownership

use crate::error::{StrobeError, StrobeResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

/// Shared running flag, the only producer state written from another thread
#[derive(Debug, Clone)]
pub struct RunFlag {
    running: Arc<AtomicBool>,
}

impl RunFlag {
    /// A new flag starts in the running state
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Ask the producer to exit at its next loop boundary
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns a producer thread. Dropping the handle stops and joins it.
pub struct ProducerHandle {
    name: String,
    flag: RunFlag,
    join: Option<JoinHandle<()>>,
}

impl ProducerHandle {
    /// Spawn `body` on a named thread governed by `flag`
    pub fn spawn<F>(name: &str, flag: RunFlag, body: F) -> StrobeResult<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let join = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(body)
            .map_err(|source| StrobeError::ThreadSpawn {
                name: name.to_string(),
                source,
            })?;

        debug!(thread = name, "producer thread started");
        Ok(Self {
            name: name.to_string(),
            flag,
            join: Some(join),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn run_flag(&self) -> RunFlag {
        self.flag.clone()
    }

    /// Request a stop; safe to call repeatedly and from any thread
    pub fn stop(&self) {
        self.flag.request_stop();
    }

    pub fn is_finished(&self) -> bool {
        self.join.as_ref().map_or(true, |j| j.is_finished())
    }

    /// Wait for the thread to exit. Does not request a stop by itself.
    pub fn join(mut self) -> StrobeResult<()> {
        self.join_inner()
    }

    /// Stop, then wait
    pub fn shutdown(self) -> StrobeResult<()> {
        self.stop();
        self.join()
    }

    fn join_inner(&mut self) -> StrobeResult<()> {
        match self.join.take() {
            Some(join) => join
                .join()
                .map_err(|_| StrobeError::ProducerPanicked(self.name.clone())),
            None => Ok(()),
        }
    }
}

impl Drop for ProducerHandle {
    fn drop(&mut self) {
        self.flag.request_stop();
        let _ = self.join_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_run_flag_shared_between_clones() {
        let flag = RunFlag::new();
        let other = flag.clone();
        assert!(other.is_running());

        flag.request_stop();
        assert!(!other.is_running());
    }

    #[test]
    fn test_shutdown_stops_loop() {
        let flag = RunFlag::new();
        let loop_flag = flag.clone();
        let handle = ProducerHandle::spawn("test-producer", flag, move || {
            while loop_flag.is_running() {
                std::thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();

        assert_eq!(handle.name(), "test-producer");
        handle.shutdown().unwrap();
    }

    #[test]
    fn test_drop_stops_and_joins() {
        let flag = RunFlag::new();
        let loop_flag = flag.clone();
        let observer = flag.clone();
        let handle = ProducerHandle::spawn("test-drop", flag, move || {
            while loop_flag.is_running() {
                std::thread::sleep(Duration::from_millis(1));
            }
        })
        .unwrap();

        drop(handle);
        assert!(!observer.is_running());
    }

    #[test]
    fn test_panicking_producer_reported() {
        let handle = ProducerHandle::spawn("test-panic", RunFlag::new(), || panic!("boom")).unwrap();
        match handle.join() {
            Err(StrobeError::ProducerPanicked(name)) => assert_eq!(name, "test-panic"),
            other => panic!("Expected ProducerPanicked, got {:?}", other),
        }
    }
}
