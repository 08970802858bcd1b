//! Packet payload decoding.
//!
//! [`PacketDecoder`] turns the opaque payload of a Data or Heartbeat packet into
//! a typed record and derives the scaled sample streams published by the bridge.

pub mod format;

mod decoder;

pub use decoder::{
    DEFAULT_PERCENT_SCALE, DEFAULT_TIME_HIGH_SCALE, Decoded, DecoderConfig, PacketDecoder,
};
pub use format::{DATA_PAYLOAD_SIZE, HeartbeatLayout, SAMPLES_PER_ENSEMBLE};
