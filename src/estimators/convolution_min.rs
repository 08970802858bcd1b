//! Running minimum of boxcar-smoothed local minima

use super::{Estimator, EstimatorInput};
use crate::types::WindowBuffer;
use crate::{RadiometerError, Result};

/// Two nested windows: raw samples (2 × taps) and per-update minima (npackets).
///
/// On every update with a full inner window, the inner samples are smoothed by
/// a uniform kernel of length `taps` (valid mode, `taps + 1` outputs), the
/// smallest smoothed value is pushed to the outer window, and the minimum of
/// the outer window is reported.
#[derive(Debug, Clone)]
pub struct ConvolutionMinTracker {
    inner: WindowBuffer,
    minima: WindowBuffer,
    taps: usize,
}

impl ConvolutionMinTracker {
    pub fn new(taps: usize, npackets: usize) -> Result<Self> {
        if taps == 0 {
            return Err(RadiometerError::config("filter taps must be positive"));
        }
        Ok(Self {
            inner: WindowBuffer::new(2 * taps)?,
            minima: WindowBuffer::new(npackets)?,
            taps,
        })
    }

    pub fn taps(&self) -> usize {
        self.taps
    }

    /// Number of local minima currently tracked.
    pub fn minima_len(&self) -> usize {
        self.minima.len()
    }

    /// Smallest boxcar mean over the inner window.
    fn smoothed_min(&mut self) -> Option<f64> {
        let taps = self.taps;
        let samples = self.inner.make_contiguous();
        if samples.len() < taps {
            return None;
        }

        let mut sum: f64 = samples[..taps].iter().sum();
        let mut lowest = sum;
        for i in taps..samples.len() {
            sum += samples[i] - samples[i - taps];
            lowest = lowest.min(sum);
        }
        Some(lowest / taps as f64)
    }
}

impl Estimator for ConvolutionMinTracker {
    fn ingest(&mut self, input: &EstimatorInput<'_>) -> Option<f64> {
        self.inner.extend(input.values()?.iter().copied());
        if !self.inner.is_full() {
            return None;
        }
        let local = self.smoothed_min()?;
        self.minima.push(local);
        self.minima.min()
    }

    fn window_len(&self) -> usize {
        self.inner.len()
    }

    fn window_capacity(&self) -> usize {
        self.inner.capacity()
    }

    fn reset(&mut self) {
        self.inner.clear();
        self.minima.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::batch;

    #[test]
    fn constant_stream_converges_to_constant() {
        let mut tracker = ConvolutionMinTracker::new(5, 3).unwrap();
        let input = batch(&[4.25; 5]);

        assert_eq!(tracker.ingest(&EstimatorInput::Batch(&input)), None);
        let mut last = None;
        for _ in 0..6 {
            last = tracker.ingest(&EstimatorInput::Batch(&input));
        }
        assert_eq!(tracker.minima_len(), 3);
        let value = last.unwrap();
        assert!((value - 4.25).abs() < 1e-12);
    }

    #[test]
    fn smoothing_suppresses_single_sample_dips() {
        let mut tracker = ConvolutionMinTracker::new(4, 10).unwrap();
        let mut values = vec![10.0; 8];
        values[3] = 2.0;

        let value = tracker.ingest(&EstimatorInput::Batch(&batch(&values))).unwrap();
        assert!((value - 8.0).abs() < 1e-12, "boxcar of [10,10,10,2] is 8, got {value}");
    }

    #[test]
    fn outer_window_holds_recent_minimum() {
        let mut tracker = ConvolutionMinTracker::new(1, 2).unwrap();
        let low = batch(&[1.0, 1.0]);
        let high = batch(&[5.0, 5.0]);

        assert_eq!(tracker.ingest(&EstimatorInput::Batch(&low)), Some(1.0));
        assert_eq!(tracker.ingest(&EstimatorInput::Batch(&high)), Some(1.0));
        // low minimum evicted after two more updates
        assert_eq!(tracker.ingest(&EstimatorInput::Batch(&high)), Some(5.0));
    }

    #[test]
    fn zero_taps_is_rejected() {
        assert!(ConvolutionMinTracker::new(0, 10).is_err());
        assert!(ConvolutionMinTracker::new(10, 0).is_err());
    }
}
