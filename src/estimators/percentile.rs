//! Percentile and median estimators

use super::{Estimator, EstimatorInput};
use crate::types::WindowBuffer;
use crate::{RadiometerError, Result};

/// Linear-interpolated percentile of an ascending slice, `percent` in `0..=100`.
///
/// The rank is `percent / 100 * (n - 1)`; fractional ranks interpolate between
/// the two neighbouring order statistics. Returns `None` for an empty slice.
pub fn percentile_of_sorted(sorted: &[f64], percent: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = percent.clamp(0.0, 100.0) / 100.0 * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let fraction = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Percentile of the most recent `width` samples.
#[derive(Debug, Clone)]
pub struct Percentile {
    window: WindowBuffer,
    percent: f64,
}

impl Percentile {
    pub fn new(width: usize, percent: f64) -> Result<Self> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(RadiometerError::config(format!(
                "percentile {} outside 0..=100",
                percent
            )));
        }
        Ok(Self { window: WindowBuffer::new(width)?, percent })
    }

    /// The 50th percentile with the same interpolation rule.
    pub fn median(width: usize) -> Result<Self> {
        Self::new(width, 50.0)
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }
}

impl Estimator for Percentile {
    fn ingest(&mut self, input: &EstimatorInput<'_>) -> Option<f64> {
        self.window.extend(input.values()?.iter().copied());
        if !self.window.is_full() {
            return None;
        }
        percentile_of_sorted(&self.window.sorted(), self.percent)
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
