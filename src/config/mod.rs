// src/config/mod.rs
//! Configuration management
//!
//! A [`SystemConfig`] is built once at startup (see [`ConfigLoader`]) and then
//! shared read-only. Components receive the section they need, usually as an
//! `Arc<LinkConfig>`, so alternate packet geometries can be tested in isolation.

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete system configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub struct SystemConfig {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

/// Packet geometry, line timeouts and device command bytes
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    #[serde(default = "defaults::channel_count")]
    pub channel_count: usize,

    #[serde(default = "defaults::bytes_per_channel")]
    pub bytes_per_channel: usize,

    #[serde(default = "defaults::invalid_marker_offset")]
    pub invalid_marker_offset: usize,

    #[serde(default = "defaults::invalid_marker_value")]
    pub invalid_marker_value: u8,

    #[serde(default = "defaults::left_high_offset")]
    pub left_high_offset: usize,

    #[serde(default = "defaults::left_low_offset")]
    pub left_low_offset: usize,

    #[serde(default = "defaults::right_high_offset")]
    pub right_high_offset: usize,

    #[serde(default = "defaults::right_low_offset")]
    pub right_low_offset: usize,

    #[serde(default = "defaults::read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "defaults::write_timeout_ms")]
    pub write_timeout_ms: u64,

    #[serde(default = "defaults::start_command")]
    pub start_command: u8,

    #[serde(default = "defaults::stop_command")]
    pub stop_command: u8,
}

/// Acquisition loop timing and fault threshold
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    #[serde(default = "defaults::max_errors")]
    pub max_errors: u32,

    #[serde(default = "defaults::settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "defaults::fault_backoff_ms")]
    pub fault_backoff_ms: u64,

    #[serde(default = "defaults::reconnect_cooldown_ms")]
    pub reconnect_cooldown_ms: u64,
}

/// Synthetic source pacing and elevation thresholds
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SyntheticConfig {
    #[serde(default = "defaults::interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "defaults::left_threshold")]
    pub left_threshold: f64,

    #[serde(default = "defaults::right_threshold")]
    pub right_threshold: f64,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;

    pub fn channel_count() -> usize { device::DEFAULT_CHANNEL_COUNT }
    pub fn bytes_per_channel() -> usize { device::DEFAULT_BYTES_PER_CHANNEL }
    pub fn invalid_marker_offset() -> usize { device::INVALID_MARKER_OFFSET }
    pub fn invalid_marker_value() -> u8 { device::INVALID_MARKER_VALUE }
    pub fn left_high_offset() -> usize { device::LEFT_HIGH_OFFSET }
    pub fn left_low_offset() -> usize { device::LEFT_LOW_OFFSET }
    pub fn right_high_offset() -> usize { device::RIGHT_HIGH_OFFSET }
    pub fn right_low_offset() -> usize { device::RIGHT_LOW_OFFSET }
    pub fn read_timeout_ms() -> u64 { link::DEFAULT_READ_TIMEOUT_MS }
    pub fn write_timeout_ms() -> u64 { link::DEFAULT_WRITE_TIMEOUT_MS }
    pub fn start_command() -> u8 { device::START_COMMAND }
    pub fn stop_command() -> u8 { device::STOP_COMMAND }

    pub fn max_errors() -> u32 { engine::DEFAULT_MAX_ERRORS }
    pub fn settle_delay_ms() -> u64 { engine::DEFAULT_SETTLE_DELAY_MS }
    pub fn fault_backoff_ms() -> u64 { engine::DEFAULT_FAULT_BACKOFF_MS }
    pub fn reconnect_cooldown_ms() -> u64 { engine::DEFAULT_RECONNECT_COOLDOWN_MS }

    pub fn interval_ms() -> u64 { synthetic::DEFAULT_INTERVAL_MS }
    pub fn left_threshold() -> f64 { synthetic::DEFAULT_LEFT_THRESHOLD }
    pub fn right_threshold() -> f64 { synthetic::DEFAULT_RIGHT_THRESHOLD }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            channel_count: defaults::channel_count(),
            bytes_per_channel: defaults::bytes_per_channel(),
            invalid_marker_offset: defaults::invalid_marker_offset(),
            invalid_marker_value: defaults::invalid_marker_value(),
            left_high_offset: defaults::left_high_offset(),
            left_low_offset: defaults::left_low_offset(),
            right_high_offset: defaults::right_high_offset(),
            right_low_offset: defaults::right_low_offset(),
            read_timeout_ms: defaults::read_timeout_ms(),
            write_timeout_ms: defaults::write_timeout_ms(),
            start_command: defaults::start_command(),
            stop_command: defaults::stop_command(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_errors: defaults::max_errors(),
            settle_delay_ms: defaults::settle_delay_ms(),
            fault_backoff_ms: defaults::fault_backoff_ms(),
            reconnect_cooldown_ms: defaults::reconnect_cooldown_ms(),
        }
    }
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            interval_ms: defaults::interval_ms(),
            left_threshold: defaults::left_threshold(),
            right_threshold: defaults::right_threshold(),
        }
    }
}

impl LinkConfig {
    /// Bytes in one full frame
    pub fn packet_size(&self) -> usize {
        self.channel_count * self.bytes_per_channel
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    /// Check that every offset lands inside a channel block
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.channel_count == 0 || self.channel_count > device::MAX_CHANNEL_COUNT {
            errors.push(format!(
                "channel_count must be in 1..={}, got {}",
                device::MAX_CHANNEL_COUNT, self.channel_count
            ));
        }

        let offsets = [
            ("invalid_marker_offset", self.invalid_marker_offset),
            ("left_high_offset", self.left_high_offset),
            ("left_low_offset", self.left_low_offset),
            ("right_high_offset", self.right_high_offset),
            ("right_low_offset", self.right_low_offset),
        ];
        for (name, offset) in offsets {
            if offset >= self.bytes_per_channel {
                errors.push(format!(
                    "{} ({}) must be less than bytes_per_channel ({})",
                    name, offset, self.bytes_per_channel
                ));
            }
        }

        for (name, timeout) in [
            ("read_timeout_ms", self.read_timeout_ms),
            ("write_timeout_ms", self.write_timeout_ms),
        ] {
            if timeout == 0 || timeout > link::MAX_TIMEOUT_MS {
                errors.push(format!(
                    "{} must be in 1..={}, got {}",
                    name, link::MAX_TIMEOUT_MS, timeout
                ));
            }
        }

        if self.start_command == self.stop_command {
            errors.push(format!(
                "start and stop commands must differ (both 0x{:02X})",
                self.start_command
            ));
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl EngineConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn fault_backoff(&self) -> Duration {
        Duration::from_millis(self.fault_backoff_ms)
    }

    pub fn reconnect_cooldown(&self) -> Duration {
        Duration::from_millis(self.reconnect_cooldown_ms)
    }

    /// Error count restored after a failed reconnect attempt
    pub fn retry_error_count(&self) -> u32 {
        self.max_errors.saturating_sub(engine::RECONNECT_RETRY_MARGIN)
    }
}

impl SyntheticConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl SystemConfig {
    /// Validate every section, collecting all problems
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = self.link.validate().err().unwrap_or_default();

        if self.engine.max_errors == 0 {
            errors.push("engine.max_errors must be greater than 0".to_string());
        }

        if self.synthetic.interval_ms == 0 {
            errors.push("synthetic.interval_ms must be greater than 0".to_string());
        }
        for (name, threshold) in [
            ("left_threshold", self.synthetic.left_threshold),
            ("right_threshold", self.synthetic.right_threshold),
        ] {
            if !threshold.is_finite() || threshold < 0.0 {
                errors.push(format!("synthetic.{} must be a non-negative number", name));
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = SystemConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.link.packet_size(), 8 * 20);
        assert_eq!(config.engine.max_errors, 5);
    }

    #[test]
    fn test_config_serialization() {
        let config = SystemConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: SystemConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_section_uses_defaults() {
        let config: SystemConfig = toml::from_str("[link]\nchannel_count = 4\n").unwrap();
        assert_eq!(config.link.channel_count, 4);
        assert_eq!(config.link.bytes_per_channel, device::DEFAULT_BYTES_PER_CHANNEL);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_marker_outside_block_rejected() {
        let link = LinkConfig {
            bytes_per_channel: 10,
            ..LinkConfig::default()
        };
        let errors = link.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.contains("invalid_marker_offset")));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let link = LinkConfig {
            read_timeout_ms: 0,
            ..LinkConfig::default()
        };
        assert!(link.validate().is_err());
    }

    #[test]
    fn test_retry_error_count() {
        let engine = EngineConfig::default();
        assert_eq!(engine.retry_error_count(), 3);

        let engine = EngineConfig { max_errors: 1, ..EngineConfig::default() };
        assert_eq!(engine.retry_error_count(), 0);
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let mut config = SystemConfig::default();
        config.synthetic.left_threshold = -1.0;
        assert!(config.validate().is_err());
    }
}
