//! Fixed binary record layouts sent by the radiometer
//!
//! All records are little-endian and have a fixed size per kind:
//!
//! 1. **Data payload** (108 bytes) - `u32 isr_clock, u32 log_clock, u16[50] samples`
//! 2. **Extended heartbeat** (28 bytes) - `u32 utc, millis, pulse_count, ns_high,
//!    irradiance, inclinometer, end_token`
//! 3. **Compact heartbeat** (20 bytes) - `u32 utc, pulse_count, ns_high, irradiance,
//!    end_token` (legacy firmware)
//!
//! The helpers at the bottom of this module do bounds-checked little-endian
//! reads.

use serde::{Deserialize, Serialize};

use crate::{RadiometerError, Result};

/// Samples per ensemble in a data packet.
pub const SAMPLES_PER_ENSEMBLE: usize = 50;

/// Two u32 counters precede the samples.
const DATA_COUNTERS_SIZE: usize = 8;

/// Data payload size in bytes (108).
pub const DATA_PAYLOAD_SIZE: usize = DATA_COUNTERS_SIZE + SAMPLES_PER_ENSEMBLE * 2;

/// Heartbeat word layout, selected by firmware generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeartbeatLayout {
    /// Seven words: utc, millis, pulse count, ns-high, irradiance, inclinometer, end token
    #[default]
    Extended,
    /// Five words: utc, pulse count, ns-high, irradiance, end token
    Compact,
}

impl HeartbeatLayout {
    /// Number of u32 words in the record.
    pub const fn words(self) -> usize {
        match self {
            HeartbeatLayout::Extended => 7,
            HeartbeatLayout::Compact => 5,
        }
    }

    /// Payload size in bytes.
    pub const fn size(self) -> usize {
        self.words() * 4
    }
}

/// Bounds-checked little-endian u16 read.
pub(crate) fn parse_u16_le(data: &[u8], offset: usize) -> Result<u16> {
    let bytes = field(data, offset, 2, "u16")?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Bounds-checked little-endian u32 read.
pub(crate) fn parse_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    let bytes = field(data, offset, 4, "u32")?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn field<'a>(data: &'a [u8], offset: usize, width: usize, what: &str) -> Result<&'a [u8]> {
    data.get(offset..offset.saturating_add(width)).ok_or_else(|| {
        RadiometerError::codec(
            format!("{} parsing", what),
            format!(
                "Insufficient data at offset {} (need {} bytes, have {})",
                offset,
                width,
                data.len().saturating_sub(offset)
            ),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_sizes_match_firmware() {
        assert_eq!(DATA_PAYLOAD_SIZE, 108);
        assert_eq!(HeartbeatLayout::Extended.size(), 28);
        assert_eq!(HeartbeatLayout::Compact.size(), 20);
    }

    #[test]
    fn little_endian_reads() {
        let data = [0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        assert_eq!(parse_u16_le(&data, 0).unwrap(), 0x1234);
        assert_eq!(parse_u32_le(&data, 2).unwrap(), 0x1234_5678);
    }

    #[test]
    fn out_of_bounds_reads_are_codec_errors() {
        let data = [0u8; 3];
        let err = parse_u32_le(&data, 0).unwrap_err();
        assert!(matches!(err, RadiometerError::Codec { .. }));
        assert!(err.to_string().contains("u32"));
        assert!(parse_u16_le(&data, 2).is_err());
        assert!(parse_u16_le(&data, usize::MAX).is_err());
    }
}
