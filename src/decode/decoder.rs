//! Payload decoding into typed records

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::format::{
    DATA_PAYLOAD_SIZE, HeartbeatLayout, SAMPLES_PER_ENSEMBLE, parse_u16_le, parse_u32_le,
};
use crate::types::{DataRecord, HeartbeatRecord, Packet, PacketKind, SampleBatch, SampleUnit};
use crate::{RadiometerError, Result};

/// Default time-high multiplier applied to raw counts.
pub const DEFAULT_TIME_HIGH_SCALE: f64 = 16.0;

/// Default percent-of-full-scale multiplier applied after the time-high scale.
pub const DEFAULT_PERCENT_SCALE: f64 = 1e-4;

/// Decoded contents of a packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    Data(DataRecord),
    Heartbeat(HeartbeatRecord),
}

/// Decoder settings for one deployment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Heartbeat word layout
    pub heartbeat_layout: HeartbeatLayout,
    /// Multiplier for the time-high stream
    pub scale: f64,
    /// Multiplier applied on top of `scale` for the percent-of-full-scale stream
    pub percent_scale: f64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            heartbeat_layout: HeartbeatLayout::Extended,
            scale: DEFAULT_TIME_HIGH_SCALE,
            percent_scale: DEFAULT_PERCENT_SCALE,
        }
    }
}

/// Converts classified packets into typed records.
///
/// A payload whose length differs from the fixed size of its kind is a
/// decode error; nothing is guessed at or truncated.
#[derive(Debug, Clone, Default)]
pub struct PacketDecoder {
    config: DecoderConfig,
}

impl PacketDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Expected payload size for a kind under this configuration.
    pub fn payload_size(&self, kind: PacketKind) -> usize {
        match kind {
            PacketKind::Data => DATA_PAYLOAD_SIZE,
            PacketKind::Heartbeat => self.config.heartbeat_layout.size(),
            PacketKind::Unknown => 0,
        }
    }

    /// Decode a packet according to its kind. Unknown packets are never decoded.
    pub fn decode(&self, packet: &Packet) -> Result<Decoded> {
        match packet.kind {
            PacketKind::Data => self.decode_data(packet.utime, &packet.payload).map(Decoded::Data),
            PacketKind::Heartbeat => {
                self.decode_heartbeat(packet.utime, &packet.payload).map(Decoded::Heartbeat)
            }
            PacketKind::Unknown => {
                Err(RadiometerError::decode_mismatch(PacketKind::Unknown, 0, packet.payload.len()))
            }
        }
    }

    /// Decode a data payload (counters retained).
    pub fn decode_data(&self, utime: i64, payload: &[u8]) -> Result<DataRecord> {
        if payload.len() != DATA_PAYLOAD_SIZE {
            return Err(RadiometerError::decode_mismatch(
                PacketKind::Data,
                DATA_PAYLOAD_SIZE,
                payload.len(),
            ));
        }

        let isr_clock = parse_u32_le(payload, 0)?;
        let log_clock = parse_u32_le(payload, 4)?;
        let samples = (0..SAMPLES_PER_ENSEMBLE)
            .map(|i| parse_u16_le(payload, 8 + 2 * i))
            .collect::<Result<Vec<u16>>>()?;

        trace!("Decoded data record: isr_clock={}, log_clock={}", isr_clock, log_clock);

        Ok(DataRecord { utime, isr_clock, log_clock, samples })
    }

    /// Decode a heartbeat payload using the configured layout.
    pub fn decode_heartbeat(&self, utime: i64, payload: &[u8]) -> Result<HeartbeatRecord> {
        let layout = self.config.heartbeat_layout;
        if payload.len() != layout.size() {
            return Err(RadiometerError::decode_mismatch(
                PacketKind::Heartbeat,
                layout.size(),
                payload.len(),
            ));
        }

        let words = (0..layout.words())
            .map(|i| parse_u32_le(payload, 4 * i))
            .collect::<Result<Vec<u32>>>()?;

        let record = match layout {
            HeartbeatLayout::Extended => HeartbeatRecord {
                utime,
                utc_seconds: words[0],
                millis: Some(words[1]),
                pulse_count: words[2],
                ns_high: words[3],
                irradiance: words[4],
                inclinometer: Some(words[5]),
                end_token: words[6],
            },
            HeartbeatLayout::Compact => HeartbeatRecord {
                utime,
                utc_seconds: words[0],
                millis: None,
                pulse_count: words[1],
                ns_high: words[2],
                irradiance: words[3],
                inclinometer: None,
                end_token: words[4],
            },
        };

        Ok(record)
    }

    /// Time-high stream for a data record (raw counts × `scale`).
    pub fn time_high(&self, record: &DataRecord) -> SampleBatch {
        record.scaled_batch(self.config.scale, SampleUnit::ScaledVoltage)
    }

    /// Percent-of-full-scale stream derived from the time-high stream.
    pub fn percent_full_scale(&self, time_high: &SampleBatch) -> SampleBatch {
        time_high.scaled(self.config.percent_scale, SampleUnit::PercentFullScale)
    }
}
