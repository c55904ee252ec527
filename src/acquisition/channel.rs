// src/acquisition/channel.rs
//! Producer/consumer hand-off of decoded samples
//!
//! An unbounded crossbeam channel: producers never block on publish, and the queue
//! depth is visible to the consumer as backpressure.

use crate::hal::types::DecodedSample;
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;
use thiserror::Error;

/// Every receiver has been dropped
#[derive(Debug, Clone, PartialEq, Error)]
#[error("sample channel closed, sample {} discarded", .0.sequence)]
pub struct ChannelClosed(pub DecodedSample);

/// Constructor for a connected sender/receiver pair
pub struct SampleChannel;

impl SampleChannel {
    pub fn unbounded() -> (SampleSender, SampleReceiver) {
        let (sender, receiver) = channel::unbounded();
        (SampleSender { inner: sender }, SampleReceiver { inner: receiver })
    }
}

/// Producer end
#[derive(Debug, Clone)]
pub struct SampleSender {
    inner: Sender<DecodedSample>,
}

impl SampleSender {
    /// Enqueue without blocking
    pub fn publish(&self, sample: DecodedSample) -> Result<(), ChannelClosed> {
        self.inner.send(sample).map_err(|e| ChannelClosed(e.into_inner()))
    }
}

/// Consumer end; takes ownership of each sample on dequeue
#[derive(Debug, Clone)]
pub struct SampleReceiver {
    inner: Receiver<DecodedSample>,
}

impl SampleReceiver {
    /// Non-blocking dequeue; `None` when the queue is currently empty
    pub fn try_recv(&self) -> Option<DecodedSample> {
        match self.inner.try_recv() {
            Ok(sample) => Some(sample),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until a sample arrives; `None` once every producer is gone and the
    /// queue is drained
    pub fn recv(&self) -> Option<DecodedSample> {
        self.inner.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<DecodedSample> {
        match self.inner.recv_timeout(timeout) {
            Ok(sample) => Some(sample),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Everything queued right now, oldest first
    pub fn drain(&self) -> Vec<DecodedSample> {
        self.inner.try_iter().collect()
    }

    /// Queue depth
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::types::Reading;

    fn sample(sequence: u64) -> DecodedSample {
        DecodedSample {
            sequence,
            timestamp_nanos: 0,
            left: vec![Reading::Counts(1)],
            right: vec![Reading::Counts(2)],
        }
    }

    #[test]
    fn test_fifo_order() {
        let (sender, receiver) = SampleChannel::unbounded();
        for i in 0..5 {
            sender.publish(sample(i)).unwrap();
        }

        assert_eq!(receiver.len(), 5);
        let sequences: Vec<u64> = receiver.drain().into_iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3, 4]);
        assert!(receiver.is_empty());
    }

    #[test]
    fn test_try_recv_on_empty_queue() {
        let (_sender, receiver) = SampleChannel::unbounded();
        assert!(receiver.try_recv().is_none());
        assert!(receiver.recv_timeout(Duration::from_millis(5)).is_none());
    }

    #[test]
    fn test_publish_after_consumer_dropped() {
        let (sender, receiver) = SampleChannel::unbounded();
        drop(receiver);

        let err = sender.publish(sample(7)).unwrap_err();
        assert_eq!(err.0.sequence, 7);
    }

    #[test]
    fn test_recv_ends_after_producers_drop() {
        let (sender, receiver) = SampleChannel::unbounded();
        sender.publish(sample(1)).unwrap();
        drop(sender);

        assert_eq!(receiver.recv().map(|s| s.sequence), Some(1));
        assert!(receiver.recv().is_none());
    }

    #[test]
    fn test_cross_thread_handoff() {
        let (sender, receiver) = SampleChannel::unbounded();
        let producer = std::thread::spawn(move || {
            for i in 0..100 {
                sender.publish(sample(i)).unwrap();
            }
        });

        let mut received = Vec::new();
        while let Some(s) = receiver.recv() {
            received.push(s.sequence);
        }
        producer.join().unwrap();

        assert_eq!(received, (0..100).collect::<Vec<_>>());
    }
}
