//! Rolling arithmetic mean

use super::{Estimator, EstimatorInput};
use crate::Result;
use crate::types::WindowBuffer;

/// Mean of the last `width` values. Usually chained after another estimator.
#[derive(Debug, Clone)]
pub struct RollingMean {
    window: WindowBuffer,
}

impl RollingMean {
    pub fn new(width: usize) -> Result<Self> {
        Ok(Self { window: WindowBuffer::new(width)? })
    }
}

impl Estimator for RollingMean {
    fn ingest(&mut self, input: &EstimatorInput<'_>) -> Option<f64> {
        self.window.extend(input.values()?.iter().copied());
        if self.window.is_full() { self.window.mean() } else { None }
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

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(value: f64) -> EstimatorInput<'static> {
        EstimatorInput::Scalar { utime: 0, value }
    }

    #[test]
    fn averages_scalar_estimates() {
        let mut mean = RollingMean::new(3).unwrap();
        assert_eq!(mean.ingest(&scalar(1.0)), None);
        assert_eq!(mean.ingest(&scalar(2.0)), None);
        assert_eq!(mean.ingest(&scalar(6.0)), Some(3.0));
        assert_eq!(mean.ingest(&scalar(4.0)), Some(4.0));
    }
}
