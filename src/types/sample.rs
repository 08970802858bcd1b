//! Decoded sample records

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Physical interpretation of the values in a [`SampleBatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleUnit {
    /// Unscaled 16-bit counts as sent by the instrument
    RawCount,
    /// Counts scaled by the time-high multiplier
    ScaledVoltage,
    /// Scaled counts expressed as a fraction of full scale
    PercentFullScale,
    /// Downwelling photon flux density
    PhotonFlux,
}

/// One ensemble of samples with the timestamp of its source packet.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBatch {
    /// Inherited from the source packet, microseconds
    pub utime: i64,

    /// Samples in acquisition order
    pub values: Arc<[f64]>,

    /// Interpretation of `values`
    pub unit: SampleUnit,
}

impl SampleBatch {
    /// Create a new batch
    pub fn new(utime: i64, values: Vec<f64>, unit: SampleUnit) -> Self {
        Self { utime, values: values.into(), unit }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when the batch carries no samples.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum of all samples.
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Smallest sample, `None` for an empty batch.
    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    /// New batch with every value multiplied by `factor`.
    pub fn scaled(&self, factor: f64, unit: SampleUnit) -> Self {
        Self {
            utime: self.utime,
            values: self.values.iter().map(|v| v * factor).collect::<Vec<_>>().into(),
            unit,
        }
    }
}

/// Fully decoded data packet, counters retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRecord {
    pub utime: i64,
    /// Interrupt-service clock cycles
    pub isr_clock: u32,
    /// Logging clock cycles
    pub log_clock: u32,
    pub samples: Vec<u16>,
}

impl DataRecord {
    /// Raw counts as a batch.
    pub fn raw_batch(&self) -> SampleBatch {
        SampleBatch::new(
            self.utime,
            self.samples.iter().map(|&s| f64::from(s)).collect(),
            SampleUnit::RawCount,
        )
    }

    /// Counts multiplied by `factor`.
    pub fn scaled_batch(&self, factor: f64, unit: SampleUnit) -> SampleBatch {
        SampleBatch::new(
            self.utime,
            self.samples.iter().map(|&s| f64::from(s) * factor).collect(),
            unit,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_reductions() {
        let batch = SampleBatch::new(10, vec![3.0, 1.0, 2.0], SampleUnit::RawCount);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.total(), 6.0);
        assert_eq!(batch.min(), Some(1.0));

        let empty = SampleBatch::new(10, vec![], SampleUnit::RawCount);
        assert!(empty.is_empty());
        assert_eq!(empty.min(), None);
    }

    #[test]
    fn scaling_keeps_timestamp() {
        let record = DataRecord { utime: 42, isr_clock: 1, log_clock: 2, samples: vec![1, 2, 3] };
        let scaled = record.scaled_batch(16.0, SampleUnit::ScaledVoltage);
        assert_eq!(scaled.utime, 42);
        assert_eq!(&*scaled.values, &[16.0, 32.0, 48.0]);

        let percent = scaled.scaled(1e-4, SampleUnit::PercentFullScale);
        assert_eq!(percent.unit, SampleUnit::PercentFullScale);
        assert!((percent.values[2] - 0.0048).abs() < 1e-12);
    }
}
