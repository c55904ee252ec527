// src/protocol/decoder.rs
//! Fixed-size packet framing and decoding
//!
//! A frame is `channel_count` blocks of `bytes_per_channel` bytes. Each block holds
//! a validity marker and two big-endian 16-bit words whose upper 12 bits are the
//! left and right capacitance readings. The arithmetic is a device contract and is
//! reproduced exactly.

use crate::config::constants::device::SAMPLE_SHIFT_BITS;
use crate::config::LinkConfig;
use crate::hal::types::{DecodedSample, Reading};
use thiserror::Error;

/// A read whose length does not match the frame size
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("bad packet: expected {expected} bytes, got {actual}")]
pub struct FramingError {
    pub expected: usize,
    pub actual: usize,
}

/// Byte positions inside a frame, copied out of [`LinkConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketLayout {
    pub channel_count: usize,
    pub bytes_per_channel: usize,
    pub invalid_marker_offset: usize,
    pub invalid_marker_value: u8,
    pub left_high_offset: usize,
    pub left_low_offset: usize,
    pub right_high_offset: usize,
    pub right_low_offset: usize,
}

impl PacketLayout {
    pub fn packet_size(&self) -> usize {
        self.channel_count * self.bytes_per_channel
    }
}

impl From<&LinkConfig> for PacketLayout {
    fn from(config: &LinkConfig) -> Self {
        Self {
            channel_count: config.channel_count,
            bytes_per_channel: config.bytes_per_channel,
            invalid_marker_offset: config.invalid_marker_offset,
            invalid_marker_value: config.invalid_marker_value,
            left_high_offset: config.left_high_offset,
            left_low_offset: config.left_low_offset,
            right_high_offset: config.right_high_offset,
            right_low_offset: config.right_low_offset,
        }
    }
}

/// Exactly one frame worth of bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket(Vec<u8>);

impl RawPacket {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

/// Stateless frame decoder
#[derive(Debug, Clone, Copy)]
pub struct PacketDecoder {
    layout: PacketLayout,
}

impl PacketDecoder {
    pub fn new(config: &LinkConfig) -> Self {
        Self::with_layout(PacketLayout::from(config))
    }

    /// The layout must come from a validated [`LinkConfig`]: a non-zero
    /// `bytes_per_channel` with every offset inside the block.
    pub fn with_layout(layout: PacketLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &PacketLayout {
        &self.layout
    }

    pub fn packet_size(&self) -> usize {
        self.layout.packet_size()
    }

    /// Accept `bytes` as a frame only if the length matches exactly
    pub fn frame(&self, bytes: Vec<u8>) -> Result<RawPacket, FramingError> {
        let expected = self.packet_size();
        if bytes.len() == expected {
            Ok(RawPacket(bytes))
        } else {
            Err(FramingError {
                expected,
                actual: bytes.len(),
            })
        }
    }

    /// Decode one frame into left/right readings per channel.
    ///
    /// `raw` must have been framed by a decoder with the same layout. The
    /// returned sample is unstamped (sequence and timestamp zero); producers
    /// stamp it before publishing.
    pub fn decode(&self, raw: &RawPacket) -> DecodedSample {
        let layout = &self.layout;
        let bytes = raw.as_bytes();
        debug_assert_eq!(
            bytes.len(),
            layout.packet_size(),
            "packet framed for a different layout"
        );

        let mut left = Vec::with_capacity(layout.channel_count);
        let mut right = Vec::with_capacity(layout.channel_count);

        for block in bytes.chunks_exact(layout.bytes_per_channel).take(layout.channel_count) {
            if block[layout.invalid_marker_offset] == layout.invalid_marker_value {
                left.push(Reading::Counts(0));
                right.push(Reading::Counts(0));
            } else {
                left.push(Reading::Counts(word_reading(
                    block[layout.left_high_offset],
                    block[layout.left_low_offset],
                )));
                right.push(Reading::Counts(word_reading(
                    block[layout.right_high_offset],
                    block[layout.right_low_offset],
                )));
            }
        }

        DecodedSample {
            sequence: 0,
            timestamp_nanos: 0,
            left,
            right,
        }
    }
}

/// `((high << 8) | low) >> 4`
#[inline]
fn word_reading(high: u8, low: u8) -> u16 {
    ((u16::from(high) << 8) | u16::from(low)) >> SAMPLE_SHIFT_BITS
}
