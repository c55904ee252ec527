//! Hardware abstraction layer for the sensing device

pub mod traits;
pub mod types;
pub mod serial_driver;
pub mod simulator;
pub mod scripted;


pub use serial_driver::{parse_port_identifier, scan_ports, LinkError, SerialConnector, SerialLink};
pub use traits::*;
pub use types::*;
