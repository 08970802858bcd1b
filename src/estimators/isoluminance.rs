//! Isoluminance averager

use super::{Estimator, EstimatorInput};
use crate::types::WindowBuffer;
use crate::{RadiometerError, Result};

/// Default number of smallest batch totals summed.
pub const DEFAULT_LOWEST: usize = 20;

/// Subtracted from the low-tail sum. Uncalibrated field constant.
pub const DEFAULT_OFFSET: f64 = 800.0;

/// Lower bound on the estimate. Uncalibrated field constant.
pub const DEFAULT_FLOOR: f64 = 2.0;

/// Sums the `lowest` smallest batch totals, subtracts `offset`, floors at `floor`.
#[derive(Debug, Clone)]
pub struct IsoluminanceAverager {
    window: WindowBuffer,
    lowest: usize,
    offset: f64,
    floor: f64,
}

impl IsoluminanceAverager {
    pub fn new(width: usize, lowest: usize, offset: f64, floor: f64) -> Result<Self> {
        if lowest == 0 || lowest > width {
            return Err(RadiometerError::config(format!(
                "isoluminance sum of {} totals needs 0 < count <= width {}",
                lowest, width
            )));
        }
        Ok(Self { window: WindowBuffer::new(width)?, lowest, offset, floor })
    }

    /// Field defaults with the given width.
    pub fn with_width(width: usize) -> Result<Self> {
        Self::new(width, DEFAULT_LOWEST, DEFAULT_OFFSET, DEFAULT_FLOOR)
    }

    fn estimate(&self) -> f64 {
        let low_tail: f64 = self.window.sorted().iter().take(self.lowest).sum();
        (low_tail - self.offset).max(self.floor)
    }
}

impl Estimator for IsoluminanceAverager {
    fn ingest(&mut self, input: &EstimatorInput<'_>) -> Option<f64> {
        self.window.push(input.values()?.iter().sum());
        self.window.is_full().then(|| self.estimate())
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
    use crate::test_utils::batch;

    #[test]
    fn subtracts_offset_from_low_tail() {
        let mut averager = IsoluminanceAverager::with_width(20).unwrap();
        let input = batch(&[25.0, 25.0]);
        let mut last = None;
        for _ in 0..20 {
            last = averager.ingest(&EstimatorInput::Batch(&input));
        }
        assert_eq!(last, Some(200.0));
    }

    #[test]
    fn floors_small_sums() {
        let mut averager = IsoluminanceAverager::with_width(20).unwrap();
        let input = batch(&[1.0]);
        let mut last = None;
        for _ in 0..20 {
            last = averager.ingest(&EstimatorInput::Batch(&input));
        }
        assert_eq!(last, Some(2.0));
    }

    #[test]
    fn only_lowest_totals_count() {
        let mut averager = IsoluminanceAverager::new(3, 2, 0.0, 0.0).unwrap();
        averager.ingest(&EstimatorInput::Batch(&batch(&[100.0])));
        averager.ingest(&EstimatorInput::Batch(&batch(&[3.0])));
        let value = averager.ingest(&EstimatorInput::Batch(&batch(&[4.0])));
        assert_eq!(value, Some(7.0));
        assert!(IsoluminanceAverager::new(3, 4, 0.0, 0.0).is_err());
    }
}
