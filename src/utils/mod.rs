//! Common utility functions

pub mod time;

pub use time::{current_timestamp_nanos, MockSleeper, Sleeper, ThreadSleeper};
