// tests/synthetic_source.rs
//! Synthetic source end to end through the sample channel

use std::sync::Arc;
use std::time::Duration;
use strobe_core::acquisition::SampleChannel;
use strobe_core::config::SyntheticConfig;
use strobe_core::hal::Reading;
use strobe_core::utils::time::MockSleeper;
use strobe_core::SyntheticSource;

fn fast_config() -> SyntheticConfig {
    SyntheticConfig {
        interval_ms: 1,
        ..SyntheticConfig::default()
    }
}

#[test]
fn test_consumer_dequeues_samples() {
    let (sender, receiver) = SampleChannel::unbounded();
    let handle = SyntheticSource::with_seed(11, 8, fast_config(), sender).start().unwrap();

    let mut samples = Vec::new();
    while samples.len() < 20 {
        match receiver.recv_timeout(Duration::from_secs(5)) {
            Some(sample) => samples.push(sample),
            None => panic!("synthetic source stalled after {} samples", samples.len()),
        }
    }
    handle.shutdown().unwrap();

    for (i, sample) in samples.iter().enumerate() {
        assert_eq!(sample.sequence, i as u64);
        assert_eq!(sample.left.len(), 8);
        assert_eq!(sample.right.len(), 8);
        for (left, right) in sample.left.iter().zip(&sample.right) {
            assert!(matches!(left, Reading::Level(_)));
            assert!(matches!(right, Reading::Level(_)));
            assert!(left.as_f64() >= 0.0 && right.as_f64() >= 0.0);
            // At most one side of an arena is elevated
            assert!(left.as_f64() <= 200.0 || right.as_f64() <= 200.0);
        }
    }
    assert!(samples.windows(2).all(|w| w[0].timestamp_nanos <= w[1].timestamp_nanos));
}

#[test]
fn test_interval_requested_between_samples() {
    let (sender, receiver) = SampleChannel::unbounded();
    let sleeper = Arc::new(MockSleeper::new());
    let source = SyntheticSource::with_seed(5, 4, SyntheticConfig::default(), sender)
        .with_sleeper(sleeper.clone());
    let stats = source.stats();

    let handle = source.start().unwrap();
    while receiver.len() < 50 {
        std::thread::yield_now();
    }
    handle.shutdown().unwrap();

    let published = stats.snapshot().samples_published;
    assert!(published >= 50);
    assert_eq!(sleeper.count_of(Duration::from_millis(100)) as u64, published);
}

#[test]
fn test_stop_before_first_sample() {
    let (sender, receiver) = SampleChannel::unbounded();
    let source = SyntheticSource::with_seed(1, 8, SyntheticConfig::default(), sender);
    source.run_flag().request_stop();

    source.start().unwrap().join().unwrap();
    assert!(receiver.is_empty());
}
