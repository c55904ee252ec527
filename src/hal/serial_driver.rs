// src/hal/serial_driver.rs
//! Serial link driver
//!
//! Opens the device at the fixed 9600/8/N/1 line settings, exposes the byte-level
//! primitives the acquisition engine needs, and enumerates candidate ports.

use crate::config::constants::link;
use crate::config::LinkConfig;
use crate::hal::traits::{LinkConnector, SerialTransport};
use crate::hal::types::{LineParameters, LinkState, PortInfo, PortScan};
use serialport::{ClearBuffer, DataBits, FlowControl, SerialPort, SerialPortType, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Link-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("failed to open serial port {port}: {cause}")]
    OpenFailed { port: String, cause: String },

    #[error("serial I/O failed: {0}")]
    IoFailed(String),

    #[error("serial link is not open")]
    NotOpen,

    #[error("serial port enumeration failed: {0}")]
    EnumerationFailed(String),
}

impl LinkError {
    fn io(err: impl std::fmt::Display) -> Self {
        LinkError::IoFailed(err.to_string())
    }
}

/// Extract the device path from a port identifier.
///
/// Port pickers show `"<device> - <description>"`; everything before the first
/// separator is the device.
pub fn parse_port_identifier(port_identifier: &str) -> &str {
    match port_identifier.split_once(link::DISPLAY_SEPARATOR) {
        Some((device, _)) => device.trim(),
        None => port_identifier.trim(),
    }
}

/// Opened serial connection to the sensing device
pub struct SerialLink {
    port_name: String,
    port: Option<Box<dyn SerialPort>>,
    line: LineParameters,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl SerialLink {
    /// Open `port_identifier` with the device's fixed line parameters and clear
    /// both OS buffers.
    pub fn open(port_identifier: &str, config: &LinkConfig) -> Result<Self, LinkError> {
        let port_name = parse_port_identifier(port_identifier).to_string();
        let line = LineParameters::default();

        let open_failed = |cause: String| LinkError::OpenFailed {
            port: port_name.clone(),
            cause,
        };

        let port = serialport::new(port_name.as_str(), line.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(config.read_timeout())
            .open()
            .map_err(|e| open_failed(e.to_string()))?;

        let mut serial_link = Self {
            port_name: port_name.clone(),
            port: Some(port),
            line,
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        };

        if let Err(e) = serial_link.reset_buffers() {
            serial_link.close();
            return Err(open_failed(e.to_string()));
        }

        info!(port = %port_name, line = %line, "serial link connected");
        Ok(serial_link)
    }

    pub fn line_parameters(&self) -> LineParameters {
        self.line
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, LinkError> {
        self.port.as_mut().ok_or(LinkError::NotOpen)
    }
}

impl SerialTransport for SerialLink {
    fn port_name(&self) -> &str {
        &self.port_name
    }

    fn state(&self) -> LinkState {
        if self.port.is_some() { LinkState::Open } else { LinkState::Closed }
    }

    fn read_exact(&mut self, len: usize) -> Result<Vec<u8>, LinkError> {
        let read_timeout = self.read_timeout;
        let port = self.port_mut()?;

        let mut buffer = vec![0u8; len];
        let mut filled = 0;
        let deadline = Instant::now() + read_timeout;

        while filled < len {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            port.set_timeout(remaining).map_err(LinkError::io)?;

            match port.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::TimedOut => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(LinkError::io(e)),
            }
        }

        buffer.truncate(filled);
        Ok(buffer)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let write_timeout = self.write_timeout;
        let port = self.port_mut()?;
        port.set_timeout(write_timeout).map_err(LinkError::io)?;
        port.write_all(bytes).map_err(LinkError::io)
    }

    fn flush(&mut self) -> Result<(), LinkError> {
        self.port_mut()?.flush().map_err(LinkError::io)
    }

    fn reset_buffers(&mut self) -> Result<(), LinkError> {
        self.port_mut()?.clear(ClearBuffer::All).map_err(LinkError::io)
    }

    fn close(&mut self) {
        // Dropping the handle releases the OS descriptor
        if self.port.take().is_some() {
            debug!(port = %self.port_name, "serial link closed");
        }
    }
}

impl Drop for SerialLink {
    fn drop(&mut self) {
        self.close();
    }
}

/// Opens real serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConnector;

impl LinkConnector for SerialConnector {
    type Link = SerialLink;

    fn open(&self, port_identifier: &str, config: &LinkConfig) -> Result<SerialLink, LinkError> {
        SerialLink::open(port_identifier, config)
    }
}

/// Enumerate serial ports, separating likely FTDI adapters
pub fn scan_ports() -> Result<PortScan, LinkError> {
    let ports = serialport::available_ports()
        .map_err(|e| LinkError::EnumerationFailed(e.to_string()))?;

    let all: Vec<PortInfo> = ports
        .into_iter()
        .map(|p| PortInfo {
            description: describe_port(&p.port_type),
            device: p.port_name,
        })
        .collect();

    let scan = PortScan::from_ports(all);
    if scan.ftdi.is_empty() && !scan.all.is_empty() {
        warn!(ports = scan.all.len(), "no FTDI adapter found among serial ports");
    }
    Ok(scan)
}

fn describe_port(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => usb
            .product
            .clone()
            .or_else(|| usb.manufacturer.clone())
            .unwrap_or_else(|| link::UNKNOWN_DESCRIPTION.to_string()),
        SerialPortType::PciPort => "PCI serial port".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth serial port".to_string(),
        SerialPortType::Unknown => link::UNKNOWN_DESCRIPTION.to_string(),
    }
}
