//! Test utilities for building wire bytes and sample batches
//!
//! Shared by unit tests and the benchmarks so every test frames the same
//! byte layouts the instrument sends.

#![cfg(any(test, feature = "benchmark"))]

use crate::types::{SampleBatch, SampleUnit};

/// Data sync token of the current firmware.
pub const DATA_TOKEN: [u8; 4] = [0xFD; 4];

/// Heartbeat sync token of the current firmware.
pub const HEARTBEAT_TOKEN: [u8; 4] = [0xFE; 4];

/// Little-endian data payload: two counters followed by the samples.
pub fn data_payload(isr_clock: u32, log_clock: u32, samples: &[u16]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(8 + 2 * samples.len());
    payload.extend_from_slice(&isr_clock.to_le_bytes());
    payload.extend_from_slice(&log_clock.to_le_bytes());
    for sample in samples {
        payload.extend_from_slice(&sample.to_le_bytes());
    }
    payload
}

/// Little-endian heartbeat payload from its u32 words.
pub fn heartbeat_payload(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}

/// Data token followed by a data payload.
pub fn data_frame(isr_clock: u32, log_clock: u32, samples: &[u16]) -> Vec<u8> {
    let mut frame = DATA_TOKEN.to_vec();
    frame.extend(data_payload(isr_clock, log_clock, samples));
    frame
}

/// Heartbeat token followed by a heartbeat payload.
pub fn heartbeat_frame(words: &[u32]) -> Vec<u8> {
    let mut frame = HEARTBEAT_TOKEN.to_vec();
    frame.extend(heartbeat_payload(words));
    frame
}

/// A stream of `packets` data frames with a heartbeat after every `per_second`,
/// and `garbage` bytes of line noise before each heartbeat.
pub fn synthetic_stream(packets: usize, per_second: usize, garbage: usize) -> Vec<u8> {
    let mut stream = Vec::new();
    for i in 0..packets {
        let samples: Vec<u16> = (0..50).map(|j| ((i * 7 + j * 13) % 4096) as u16).collect();
        stream.extend(data_frame(i as u32, i as u32, &samples));

        if per_second > 0 && (i + 1) % per_second == 0 {
            stream.extend((0..garbage).map(|g| (g % 0xF0) as u8));
            let second = ((i + 1) / per_second) as u32;
            stream.extend(heartbeat_frame(&[second, 0, second * 10, 0, 500, 0, 0xAAAA_5555]));
        }
    }
    stream
}

/// Batch of arbitrary values with a zero timestamp.
pub fn batch(values: &[f64]) -> SampleBatch {
    SampleBatch::new(0, values.to_vec(), SampleUnit::ScaledVoltage)
}
