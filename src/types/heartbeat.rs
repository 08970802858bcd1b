//! Instrument heartbeat record

use serde::{Deserialize, Serialize};

/// Once-per-second status record sent by the radiometer.
///
/// The compact legacy layout has no `millis` or `inclinometer` words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeartbeatRecord {
    /// Receive time of the source packet, microseconds
    pub utime: i64,
    /// Instrument UTC seconds
    pub utc_seconds: u32,
    /// Milliseconds since instrument start
    pub millis: Option<u32>,
    /// Cumulative photon pulse count
    pub pulse_count: u32,
    /// High word of the pulse time, nanoseconds
    pub ns_high: u32,
    /// Instantaneous irradiance word
    pub irradiance: u32,
    /// Inclinometer reading
    pub inclinometer: Option<u32>,
    /// Trailing end-of-record token
    pub end_token: u32,
}
