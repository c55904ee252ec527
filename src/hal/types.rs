// src/hal/types.rs
//! Core types shared by the serial link, the decoder and the producers

use crate::config::constants::link;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One capacitance reading
///
/// Hardware frames carry 12-bit integer counts; the synthetic source produces
/// floating levels. Both mean "relative capacitance" to a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Counts(u16),
    Level(f64),
}

impl Reading {
    pub fn as_f64(self) -> f64 {
        match self {
            Reading::Counts(counts) => f64::from(counts),
            Reading::Level(level) => level,
        }
    }
}

impl Default for Reading {
    fn default() -> Self {
        Reading::Counts(0)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Counts(counts) => write!(f, "{}", counts),
            Reading::Level(level) => write!(f, "{:.1}", level),
        }
    }
}

/// Left/right readings for every arena, index-aligned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedSample {
    /// Per-producer sequence number
    pub sequence: u64,
    pub timestamp_nanos: u64,
    pub left: Vec<Reading>,
    pub right: Vec<Reading>,
}

impl DecodedSample {
    /// Attach producer metadata
    pub fn stamped(mut self, sequence: u64, timestamp_nanos: u64) -> Self {
        self.sequence = sequence;
        self.timestamp_nanos = timestamp_nanos;
        self
    }

    pub fn channel_count(&self) -> usize {
        self.left.len()
    }

    /// Readings for arena `index` as `(left, right)`
    pub fn arena(&self, index: usize) -> Option<(Reading, Reading)> {
        Some((*self.left.get(index)?, *self.right.get(index)?))
    }

    pub fn left_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.left.iter().map(|r| r.as_f64())
    }

    pub fn right_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.right.iter().map(|r| r.as_f64())
    }
}

/// Serial port as reported by enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortInfo {
    pub device: String,
    pub description: String,
}

impl PortInfo {
    /// Composite form shown by port pickers, accepted back by `SerialLink::open`
    pub fn display_name(&self) -> String {
        format!("{}{}{}", self.device, link::DISPLAY_SEPARATOR, self.description)
    }

    pub fn is_ftdi(&self) -> bool {
        link::FTDI_MARKERS
            .iter()
            .any(|marker| self.description.contains(marker))
    }
}

/// Result of a port scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortScan {
    pub ftdi: Vec<PortInfo>,
    pub all: Vec<PortInfo>,
}

impl PortScan {
    pub fn from_ports(all: Vec<PortInfo>) -> Self {
        let ftdi = all.iter().filter(|p| p.is_ftdi()).cloned().collect();
        Self { ftdi, all }
    }
}

/// Connection state of a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Closed,
    Open,
}

/// Serial parity settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Odd,
    Even,
}

/// Line parameters negotiated on open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineParameters {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub parity: Parity,
    pub stop_bits: u8,
}

impl Default for LineParameters {
    /// The device only speaks 9600/8/N/1
    fn default() -> Self {
        Self {
            baud_rate: link::BAUD_RATE,
            data_bits: link::DATA_BITS,
            parity: Parity::None,
            stop_bits: link::STOP_BITS,
        }
    }
}

impl fmt::Display for LineParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parity = match self.parity {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        };
        write!(f, "{}/{}/{}/{}", self.baud_rate, self.data_bits, parity, self.stop_bits)
    }
}
