//! Sort-and-sum-the-lowest ambient estimator

use super::{Estimator, EstimatorInput};
use crate::types::WindowBuffer;
use crate::{RadiometerError, Result};

/// Lower bound on the estimate, keeping a downstream log transform defined.
pub const ESTIMATE_FLOOR: f64 = 1e-16;

/// Sums the `inner_count` smallest samples of a sample window.
///
/// Bioluminescent flashes only ever add light, so the low tail of a long
/// window tracks the ambient level.
#[derive(Debug, Clone)]
pub struct TrimmedSortSum {
    window: WindowBuffer,
    inner_count: usize,
}

impl TrimmedSortSum {
    /// `capacity` samples in the window, `inner_count` of them summed.
    pub fn new(capacity: usize, inner_count: usize) -> Result<Self> {
        if inner_count == 0 || inner_count > capacity {
            return Err(RadiometerError::config(format!(
                "trimmed sum of {} values needs 0 < count <= window capacity {}",
                inner_count, capacity
            )));
        }
        Ok(Self { window: WindowBuffer::new(capacity)?, inner_count })
    }

    /// Window and sum widths given in ensembles of `samples_per_batch` samples.
    pub fn from_ensembles(width: usize, sum_width: usize, samples_per_batch: usize) -> Result<Self> {
        Self::new(width * samples_per_batch, sum_width * samples_per_batch)
    }

    pub fn inner_count(&self) -> usize {
        self.inner_count
    }

    fn estimate(&self) -> f64 {
        let sorted = self.window.sorted();
        let total: f64 = sorted.iter().take(self.inner_count).sum();
        total.max(ESTIMATE_FLOOR)
    }
}

impl Estimator for TrimmedSortSum {
    fn ingest(&mut self, input: &EstimatorInput<'_>) -> Option<f64> {
        self.window.extend(input.values()?.iter().copied());
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
    use proptest::prelude::*;

    #[test]
    fn sums_lowest_values_once_full() {
        let mut estimator = TrimmedSortSum::new(6, 2).unwrap();
        assert_eq!(estimator.ingest(&EstimatorInput::Batch(&batch(&[5.0, 1.0, 9.0]))), None);
        assert_eq!(estimator.window_len(), 3);

        let value = estimator.ingest(&EstimatorInput::Batch(&batch(&[2.0, 8.0, 7.0])));
        assert_eq!(value, Some(3.0));
    }

    #[test]
    fn non_positive_sums_hit_the_floor() {
        let mut estimator = TrimmedSortSum::new(3, 2).unwrap();
        let value = estimator.ingest(&EstimatorInput::Batch(&batch(&[-4.0, 0.0, 1.0])));
        assert_eq!(value, Some(ESTIMATE_FLOOR));
    }

    #[test]
    fn ensemble_widths_scale_by_batch_size() {
        let estimator = TrimmedSortSum::from_ensembles(200, 20, 50).unwrap();
        assert_eq!(estimator.window_capacity(), 10_000);
        assert_eq!(estimator.inner_count(), 1_000);

        assert!(TrimmedSortSum::new(10, 11).is_err());
        assert!(TrimmedSortSum::new(10, 0).is_err());
    }

    #[test]
    fn heartbeats_are_ignored() {
        let mut estimator = TrimmedSortSum::new(2, 1).unwrap();
        estimator.ingest(&EstimatorInput::Batch(&batch(&[1.0, 2.0])));
        assert_eq!(estimator.ingest(&EstimatorInput::Heartbeat { utime: 0 }), None);
        assert_eq!(estimator.window_len(), 2);
    }

    proptest! {
        #[test]
        fn constant_window_sums_to_count_times_value(
            value in -1e3f64..1e3,
            capacity in 1usize..200,
            inner in 1usize..200,
        ) {
            prop_assume!(inner <= capacity);
            let mut estimator = TrimmedSortSum::new(capacity, inner).unwrap();
            let values = vec![value; capacity];
            let estimate = estimator.ingest(&EstimatorInput::Batch(&batch(&values))).unwrap();

            let expected = inner as f64 * value;
            if expected <= 0.0 {
                prop_assert_eq!(estimate, ESTIMATE_FLOOR);
            } else {
                prop_assert!((estimate - expected).abs() <= 1e-9 * expected.abs().max(1.0));
            }
        }
    }
}
