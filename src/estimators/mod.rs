//! Sliding-window ambient irradiance estimators.
//!
//! Every estimator owns its [`WindowBuffer`](crate::types::WindowBuffer)s and
//! implements the single [`Estimator::ingest`] contract. Which variant runs is
//! decided at startup by an [`EstimatorConfig`], which also derives the output
//! channel from the input channel so different configurations never collide.
//!
//! ## Variants
//!
//! | Estimator | Window contents | Result on full window |
//! |---|---|---|
//! | [`TrimmedSortSum`] | samples | sum of the lowest values, floored at 1e-16 |
//! | [`Percentile`] | samples | linear-interpolated percentile (median = 50) |
//! | [`RollingMean`] | values | mean |
//! | [`ConvolutionMinTracker`] | samples, then local minima | min of boxcar minima |
//! | [`MinMin`] | one minimum per batch | min |
//! | [`Accumulator`] | one total per batch | sum (optionally cleared by heartbeats) |
//! | [`IsoluminanceAverager`] | one total per batch | low-tail sum minus offset, floored |
//!
//! ## Usage Example
//!
//! ```rust
//! use radiometer::estimators::{ConfiguredEstimator, EstimatorConfig, EstimatorInput, NotFullLogging};
//! use radiometer::types::{SampleBatch, SampleUnit};
//!
//! let config: EstimatorConfig = serde_yaml_ng::from_str("kind: min_min\nwidth: 2").unwrap();
//! let mut estimator = ConfiguredEstimator::new("RAD2d", &config, NotFullLogging::Quiet).unwrap();
//! assert_eq!(estimator.output_channel(), "RAD2d2mm");
//!
//! let batch = SampleBatch::new(1, vec![3.0, 1.0], SampleUnit::ScaledVoltage);
//! assert!(estimator.ingest(&EstimatorInput::Batch(&batch)).is_none());
//! let result = estimator.ingest(&EstimatorInput::Batch(&batch)).unwrap();
//! assert_eq!(result.value, 1.0);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::Result;
use crate::types::{EstimateResult, SampleBatch};

mod accumulator;
mod config;
mod convolution_min;
mod isoluminance;
mod minmin;
mod percentile;
mod rolling_mean;
mod trimmed_sum;

pub use accumulator::Accumulator;
pub use config::{
    AccumulatorConfig, ConvolutionMinConfig, EstimatorConfig, HeartbeatAccumulatorConfig,
    IsoluminanceConfig, MedianConfig, MinMinConfig, PercentileConfig, RollingMeanConfig,
    TrimmedSortSumConfig,
};
pub use convolution_min::ConvolutionMinTracker;
pub use isoluminance::{DEFAULT_FLOOR, DEFAULT_LOWEST, DEFAULT_OFFSET, IsoluminanceAverager};
pub use minmin::MinMin;
pub use percentile::{Percentile, percentile_of_sorted};
pub use rolling_mean::RollingMean;
pub use trimmed_sum::{ESTIMATE_FLOOR, TrimmedSortSum};

/// One input to an estimator.
#[derive(Debug, Clone, Copy)]
pub enum EstimatorInput<'a> {
    /// A decoded sample ensemble
    Batch(&'a SampleBatch),
    /// A single upstream estimate
    Scalar { utime: i64, value: f64 },
    /// A heartbeat arrived on the companion channel
    Heartbeat { utime: i64 },
}

impl<'a> EstimatorInput<'a> {
    /// Timestamp carried by the input.
    pub fn utime(&self) -> i64 {
        match self {
            EstimatorInput::Batch(batch) => batch.utime,
            EstimatorInput::Scalar { utime, .. } | EstimatorInput::Heartbeat { utime } => *utime,
        }
    }

    /// Sample values, `None` for heartbeats.
    pub fn values(&self) -> Option<&[f64]> {
        match self {
            EstimatorInput::Batch(batch) => Some(batch.values.as_ref()),
            EstimatorInput::Scalar { value, .. } => Some(std::slice::from_ref(value)),
            EstimatorInput::Heartbeat { .. } => None,
        }
    }
}

/// A stateful streaming filter producing a scalar once its window is full.
pub trait Estimator: Send + fmt::Debug {
    /// Feed one input. Returns an estimate for every input observed with a full window.
    fn ingest(&mut self, input: &EstimatorInput<'_>) -> Option<f64>;

    /// Length of the window that gates emission.
    fn window_len(&self) -> usize;

    /// Capacity of the window that gates emission.
    fn window_capacity(&self) -> usize;

    /// Drop all buffered state.
    fn reset(&mut self);

    /// Whether heartbeats on the companion channel affect this estimator.
    fn is_heartbeat_synced(&self) -> bool {
        false
    }
}

/// How loudly to report inputs that leave the window short of capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFullLogging {
    /// Log at trace level
    #[default]
    Quiet,
    /// Log at debug level
    Verbose,
}

/// An estimator bound to its input and output channels.
#[derive(Debug)]
pub struct ConfiguredEstimator {
    estimator: Box<dyn Estimator>,
    input_channel: String,
    output_channel: String,
    heartbeat_channel: Option<String>,
    not_full_logging: NotFullLogging,
}

impl ConfiguredEstimator {
    /// Build the configured variant for `input_channel`.
    pub fn new(
        input_channel: impl Into<String>,
        config: &EstimatorConfig,
        not_full_logging: NotFullLogging,
    ) -> Result<Self> {
        let input_channel = input_channel.into();
        let estimator = config.build()?;
        let output_channel = config.output_channel(&input_channel);
        let heartbeat_channel = estimator
            .is_heartbeat_synced()
            .then(|| crate::channel::heartbeat_companion(&input_channel));

        Ok(Self { estimator, input_channel, output_channel, heartbeat_channel, not_full_logging })
    }

    pub fn input_channel(&self) -> &str {
        &self.input_channel
    }

    pub fn output_channel(&self) -> &str {
        &self.output_channel
    }

    /// Companion heartbeat channel, for heartbeat-synced variants.
    pub fn heartbeat_channel(&self) -> Option<&str> {
        self.heartbeat_channel.as_deref()
    }

    pub fn estimator(&self) -> &dyn Estimator {
        self.estimator.as_ref()
    }

    /// Feed one input and stamp any estimate with the input's timestamp.
    pub fn ingest(&mut self, input: &EstimatorInput<'_>) -> Option<EstimateResult> {
        let value = self.estimator.ingest(input);
        if value.is_none() && !matches!(input, EstimatorInput::Heartbeat { .. }) {
            self.log_not_full();
        }
        value.map(|v| EstimateResult::new(input.utime(), v, self.output_channel.clone()))
    }

    fn log_not_full(&self) {
        let len = self.estimator.window_len();
        let capacity = self.estimator.window_capacity();
        match self.not_full_logging {
            NotFullLogging::Verbose => debug!("window not full: {} < {}", len, capacity),
            NotFullLogging::Quiet => trace!("window not full: {} < {}", len, capacity),
        }
    }
}
