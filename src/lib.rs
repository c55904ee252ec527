//! STROBE core: serial acquisition engine for capacitive arena sensing
//!
//! Reads fixed-size packets from the sensing device over a serial link, decodes
//! left/right capacitance readings for every arena, and hands them to a consumer
//! through a FIFO channel. A synthetic source produces the same sample shape when
//! no hardware is attached.
//!
//! - Serial link driver with port enumeration and a scripted fake for tests
//! - Stateless packet decoder
//! - Fault-tolerant acquisition engine with automatic reconnect
//! - Layered TOML configuration with environment overrides
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strobe_core::acquisition::{AcquisitionEngine, SampleChannel};
//! use strobe_core::config::ConfigLoader;
//! use strobe_core::hal::SerialConnector;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigLoader::new().load()?;
//!     let (sender, receiver) = SampleChannel::unbounded();
//!
//!     let engine = AcquisitionEngine::connect(
//!         SerialConnector,
//!         "/dev/ttyUSB0 - FT232R USB UART",
//!         Arc::new(config.link),
//!         config.engine,
//!         sender,
//!     )?;
//!     let handle = engine.start()?;
//!
//!     for _ in 0..10 {
//!         if let Some(sample) = receiver.recv() {
//!             println!("{:?} {:?}", sample.left, sample.right);
//!         }
//!     }
//!
//!     handle.shutdown()?;
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod config;
pub mod error;
pub mod hal;
pub mod protocol;
pub mod utils;

// Re-export commonly used types for convenience
pub use acquisition::{AcquisitionEngine, ProducerHandle, SampleChannel, SampleReceiver, SampleSender};
pub use config::{ConfigLoader, EngineConfig, LinkConfig, SyntheticConfig, SystemConfig};
pub use error::{StrobeError, StrobeResult};
pub use hal::{DecodedSample, LinkError, PortInfo, Reading, SerialConnector};
pub use hal::simulator::SyntheticSource;
pub use protocol::PacketDecoder;
pub use utils::time::current_timestamp_nanos;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Serial acquisition engine for capacitive arena sensing".to_string(),
        features: vec![
            "Serial link driver".to_string(),
            "Packet decoding".to_string(),
            "Fault-tolerant acquisition".to_string(),
            "Synthetic sample source".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert_eq!(info.name, NAME);
        assert_eq!(info.version, VERSION);
        assert!(!info.features.is_empty());
    }
}
