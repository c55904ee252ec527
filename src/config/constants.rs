// src/config/constants.rs
//! System-wide configuration constants
//!
//! Every value here is a default; the live values travel in [`crate::config::SystemConfig`].

/// Device wire-protocol constants
pub mod device {
    pub const DEFAULT_CHANNEL_COUNT: usize = 8;
    pub const DEFAULT_BYTES_PER_CHANNEL: usize = 20;
    pub const MAX_CHANNEL_COUNT: usize = 64;

    pub const INVALID_MARKER_OFFSET: usize = 18;
    pub const INVALID_MARKER_VALUE: u8 = 0xFF;

    // Big-endian word positions inside a channel block
    pub const LEFT_HIGH_OFFSET: usize = 1;
    pub const LEFT_LOW_OFFSET: usize = 2;
    pub const RIGHT_HIGH_OFFSET: usize = 3;
    pub const RIGHT_LOW_OFFSET: usize = 4;

    /// Low bits discarded from each 16-bit word
    pub const SAMPLE_SHIFT_BITS: u32 = 4;

    pub const START_COMMAND: u8 = b'G';
    pub const STOP_COMMAND: u8 = b'S';
}

/// Serial line constants
pub mod link {
    pub const BAUD_RATE: u32 = 9600;
    pub const DATA_BITS: u8 = 8;
    pub const STOP_BITS: u8 = 1;

    pub const DEFAULT_READ_TIMEOUT_MS: u64 = 500;
    pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 500;
    pub const MAX_TIMEOUT_MS: u64 = 60_000;

    /// Separator used by port pickers: `"<device> - <description>"`
    pub const DISPLAY_SEPARATOR: &str = " - ";
    pub const UNKNOWN_DESCRIPTION: &str = "n/a";
    pub const FTDI_MARKERS: &[&str] = &["FTDI", "FT"];
}

/// Acquisition loop timing and fault handling
pub mod engine {
    pub const DEFAULT_MAX_ERRORS: u32 = 5;
    pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;
    pub const DEFAULT_FAULT_BACKOFF_MS: u64 = 500;
    pub const DEFAULT_RECONNECT_COOLDOWN_MS: u64 = 2000;

    /// After a failed reconnect the error count restarts this far below the
    /// threshold. Tuning constant, not a derived value.
    pub const RECONNECT_RETRY_MARGIN: u32 = 2;

    pub const ACQUISITION_THREAD_NAME: &str = "strobe-acquisition";
    pub const SYNTHETIC_THREAD_NAME: &str = "strobe-synthetic";
}

/// Synthetic source constants
pub mod synthetic {
    pub const DEFAULT_INTERVAL_MS: u64 = 100;
    pub const DEFAULT_LEFT_THRESHOLD: f64 = 1000.0;
    pub const DEFAULT_RIGHT_THRESHOLD: f64 = 1000.0;

    pub const BASELINE_MIN: f64 = 50.0;
    pub const BASELINE_MAX: f64 = 200.0;
    pub const ELEVATED_MIN_OFFSET: f64 = 50.0;
    pub const ELEVATED_MAX_OFFSET: f64 = 500.0;

    pub const BASELINE_PROBABILITY: f64 = 0.50;
    pub const RIGHT_ELEVATED_PROBABILITY: f64 = 0.25;
}

/// File system paths
pub mod paths {
    pub const SYSTEM_CONFIG_PATH: &str = "/etc/strobe/config.toml";
    pub const USER_CONFIG_DIR: &str = ".config/strobe";
    pub const LOCAL_CONFIG_FILE: &str = "config.toml";
    pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";

    pub const ENV_PREFIX: &str = "STROBE_";
    pub const ENV_SECTION_SEPARATOR: &str = "__";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_fits_in_channel_block() {
        assert!(device::INVALID_MARKER_OFFSET < device::DEFAULT_BYTES_PER_CHANNEL);
        assert!(device::RIGHT_LOW_OFFSET < device::DEFAULT_BYTES_PER_CHANNEL);
    }

    #[test]
    fn test_command_bytes() {
        assert_eq!(device::START_COMMAND, 0x47);
        assert_eq!(device::STOP_COMMAND, 0x53);
    }

    #[test]
    fn test_retry_margin_below_threshold() {
        assert!(engine::RECONNECT_RETRY_MARGIN < engine::DEFAULT_MAX_ERRORS);
    }

    #[test]
    fn test_synthetic_probabilities() {
        let elevated_left = 1.0 - synthetic::BASELINE_PROBABILITY - synthetic::RIGHT_ELEVATED_PROBABILITY;
        assert!((elevated_left - 0.25).abs() < f64::EPSILON);
    }
}
