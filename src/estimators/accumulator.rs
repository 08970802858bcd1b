//! Windowed sums of per-batch totals

use super::{Estimator, EstimatorInput};
use crate::Result;
use crate::types::WindowBuffer;

/// Sum of the last `width` batch totals.
///
/// The heartbeat-synced form clears its window whenever a heartbeat arrives,
/// so every emitted sum covers batches from a single heartbeat epoch.
#[derive(Debug, Clone)]
pub struct Accumulator {
    window: WindowBuffer,
    heartbeat_synced: bool,
}

impl Accumulator {
    /// Plain accumulator; heartbeats are ignored.
    pub fn new(width: usize) -> Result<Self> {
        Ok(Self { window: WindowBuffer::new(width)?, heartbeat_synced: false })
    }

    /// Accumulator whose window is cleared on every heartbeat.
    pub fn heartbeat_synced(width: usize) -> Result<Self> {
        Ok(Self { window: WindowBuffer::new(width)?, heartbeat_synced: true })
    }
}

impl Estimator for Accumulator {
    fn ingest(&mut self, input: &EstimatorInput<'_>) -> Option<f64> {
        if let EstimatorInput::Heartbeat { .. } = input {
            if self.heartbeat_synced {
                self.window.clear();
            }
            return None;
        }

        self.window.push(input.values()?.iter().sum());
        self.window.is_full().then(|| self.window.sum())
    }

    fn window_len(&self) -> usize {
        self.window.len()
    }

    fn window_capacity(&self) -> usize {
        self.window.capacity()
    }

    fn reset(&mut self) {
        self.window.clear();
    }

    fn is_heartbeat_synced(&self) -> bool {
        self.heartbeat_synced
    }
}
