//! Payload messages carried on the bus
//!
//! Every payload is one [`BusPayload`] serialised with bincode (fixed-width
//! little-endian integers). The variant index leads the bytes, so a stage can
//! tell a sample batch from an estimate without a side channel. Truncated or
//! padded input is rejected.

use bincode::Options;
use serde::{Deserialize, Serialize};

use crate::types::{EstimateResult, SampleBatch};
use crate::{RadiometerError, Result};

/// Raw serial bytes (sync token followed by payload).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBytesMessage {
    pub utime: i64,
    pub data: Vec<u8>,
}

/// A batch of sample values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatsMessage {
    pub utime: i64,
    pub data: Vec<f64>,
}

impl From<&SampleBatch> for FloatsMessage {
    fn from(batch: &SampleBatch) -> Self {
        Self { utime: batch.utime, data: batch.values.to_vec() }
    }
}

/// A single irradiance estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RadiometerMessage {
    pub utime: i64,
    /// mol m-2 s-1
    pub downwelling_photon_spherical_irradiance: f64,
}

impl From<&EstimateResult> for RadiometerMessage {
    fn from(result: &EstimateResult) -> Self {
        Self { utime: result.utime, downwelling_photon_spherical_irradiance: result.value }
    }
}

/// Everything that travels over the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BusPayload {
    Raw(RawBytesMessage),
    Floats(FloatsMessage),
    Estimate(RadiometerMessage),
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .reject_trailing_bytes()
}

impl BusPayload {
    /// Serialise to bus bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        codec()
            .serialize(self)
            .map_err(|e| RadiometerError::codec(format!("{} encode", self.name()), e.to_string()))
    }

    /// Parse bus bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        codec()
            .deserialize(bytes)
            .map_err(|e| RadiometerError::codec("bus payload", e.to_string()))
    }

    pub fn name(&self) -> &'static str {
        match self {
            BusPayload::Raw(_) => "raw_bytes",
            BusPayload::Floats(_) => "floats",
            BusPayload::Estimate(_) => "radiometer",
        }
    }

    pub fn utime(&self) -> i64 {
        match self {
            BusPayload::Raw(m) => m.utime,
            BusPayload::Floats(m) => m.utime,
            BusPayload::Estimate(m) => m.utime,
        }
    }

    pub fn into_raw(self) -> Result<RawBytesMessage> {
        match self {
            BusPayload::Raw(m) => Ok(m),
            other => Err(other.unexpected("raw_bytes")),
        }
    }

    pub fn into_floats(self) -> Result<FloatsMessage> {
        match self {
            BusPayload::Floats(m) => Ok(m),
            other => Err(other.unexpected("floats")),
        }
    }

    pub fn into_estimate(self) -> Result<RadiometerMessage> {
        match self {
            BusPayload::Estimate(m) => Ok(m),
            other => Err(other.unexpected("radiometer")),
        }
    }

    fn unexpected(&self, wanted: &str) -> RadiometerError {
        RadiometerError::codec(wanted, format!("unexpected {} message", self.name()))
    }
}

impl From<RawBytesMessage> for BusPayload {
    fn from(message: RawBytesMessage) -> Self {
        BusPayload::Raw(message)
    }
}

impl From<FloatsMessage> for BusPayload {
    fn from(message: FloatsMessage) -> Self {
        BusPayload::Floats(message)
    }
}

impl From<RadiometerMessage> for BusPayload {
    fn from(message: RadiometerMessage) -> Self {
        BusPayload::Estimate(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(payload: impl Into<BusPayload>) -> Vec<u8> {
        payload.into().encode().unwrap()
    }

    #[test]
    fn messages_round_trip() {
        let raw = RawBytesMessage { utime: -5, data: vec![0xFD, 0xFD, 1, 2] };
        assert_eq!(BusPayload::decode(&encode(raw.clone())).unwrap(), BusPayload::Raw(raw));

        let floats = FloatsMessage { utime: 1_700_000_000_000_000, data: vec![0.5, -1.25, 1e-4] };
        let decoded = BusPayload::decode(&encode(floats.clone())).unwrap();
        assert_eq!(decoded.utime(), floats.utime);
        assert_eq!(decoded.into_floats().unwrap(), floats);

        let estimate =
            RadiometerMessage { utime: 7, downwelling_photon_spherical_irradiance: 1e-16 };
        let decoded = BusPayload::decode(&encode(estimate)).unwrap();
        assert_eq!(decoded.into_estimate().unwrap(), estimate);
    }

    #[test]
    fn truncated_payload_is_codec_error() {
        let bytes = encode(FloatsMessage { utime: 1, data: vec![1.0, 2.0] });
        let err = BusPayload::decode(&bytes[..bytes.len() - 3]).unwrap_err();
        match err {
            RadiometerError::Codec { context, .. } => assert_eq!(context, "bus payload"),
            other => panic!("Expected codec error, got {other:?}"),
        }

        assert!(BusPayload::decode(&[2, 0, 0]).is_err());
        assert!(BusPayload::decode(&[]).is_err());
    }

    #[test]
    fn trailing_bytes_and_wrong_variants_are_rejected() {
        let mut bytes = encode(RadiometerMessage { utime: 1, downwelling_photon_spherical_irradiance: 2.0 });
        bytes.push(0);
        assert!(BusPayload::decode(&bytes).is_err());

        let mut unknown = encode(RawBytesMessage { utime: 1, data: vec![] });
        unknown[0] = 9;
        assert!(BusPayload::decode(&unknown).is_err());

        let raw = BusPayload::decode(&encode(RawBytesMessage { utime: 1, data: vec![] })).unwrap();
        let err = raw.into_floats().unwrap_err();
        assert!(err.to_string().contains("unexpected raw_bytes message"));
    }

    #[test]
    fn conversions_keep_timestamps() {
        let result = EstimateResult::new(42, 3.5, "RAD2d40mm");
        let message = RadiometerMessage::from(&result);
        assert_eq!(message.utime, 42);
        assert_eq!(message.downwelling_photon_spherical_irradiance, 3.5);
    }
}
