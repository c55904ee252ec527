//! Device wire protocol

pub mod decoder;

pub use decoder::{FramingError, PacketDecoder, PacketLayout, RawPacket};
