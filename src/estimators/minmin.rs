//! Minimum of per-batch minima

use super::{Estimator, EstimatorInput};
use crate::Result;
use crate::types::WindowBuffer;

/// Each batch contributes its own minimum; reports the minimum of the last `width`.
#[derive(Debug, Clone)]
pub struct MinMin {
    window: WindowBuffer,
}

impl MinMin {
    pub fn new(width: usize) -> Result<Self> {
        Ok(Self { window: WindowBuffer::new(width)? })
    }
}

impl Estimator for MinMin {
    fn ingest(&mut self, input: &EstimatorInput<'_>) -> Option<f64> {
        let batch_min = input.values()?.iter().copied().reduce(f64::min)?;
        self.window.push(batch_min);
        if self.window.is_full() { self.window.min() } else { None }
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
}
