//! Estimator selection and output channel derivation

use serde::{Deserialize, Serialize};

use super::{
    Accumulator, ConvolutionMinTracker, Estimator, IsoluminanceAverager, MinMin, Percentile,
    RollingMean, TrimmedSortSum, isoluminance,
};
use crate::Result;
use crate::channel::with_user_suffix;
use crate::decode::SAMPLES_PER_ENSEMBLE;

/// Which estimator to run, with its parameters.
///
/// Every variant accepts an optional `suffix`. When set, the output channel is
/// the first four characters of the input channel followed by the suffix;
/// otherwise it is the variant's own derivation from the input channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EstimatorConfig {
    TrimmedSortSum(TrimmedSortSumConfig),
    Percentile(PercentileConfig),
    Median(MedianConfig),
    RollingMean(RollingMeanConfig),
    ConvolutionMin(ConvolutionMinConfig),
    MinMin(MinMinConfig),
    HeartbeatSyncedAccumulator(HeartbeatAccumulatorConfig),
    Accumulator(AccumulatorConfig),
    Isoluminance(IsoluminanceConfig),
}

/// Window and sum widths are in ensembles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimmedSortSumConfig {
    pub width: usize,
    pub sum_width: usize,
    pub samples_per_batch: usize,
    pub suffix: Option<String>,
}

impl Default for TrimmedSortSumConfig {
    fn default() -> Self {
        Self {
            width: 200,
            sum_width: 20,
            samples_per_batch: SAMPLES_PER_ENSEMBLE,
            suffix: Some("u".to_string()),
        }
    }
}

/// `percentile` in `0..=100`, `width` in samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentileConfig {
    pub percentile: f64,
    pub width: usize,
    pub suffix: Option<String>,
}

impl Default for PercentileConfig {
    fn default() -> Self {
        Self { percentile: 1.0, width: 2000, suffix: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MedianConfig {
    pub width: usize,
    pub suffix: Option<String>,
}

impl Default for MedianConfig {
    fn default() -> Self {
        Self { width: 2000, suffix: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingMeanConfig {
    pub width: usize,
    pub suffix: Option<String>,
}

impl Default for RollingMeanConfig {
    fn default() -> Self {
        Self { width: 100, suffix: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvolutionMinConfig {
    pub taps: usize,
    pub packets: usize,
    pub suffix: Option<String>,
}

impl Default for ConvolutionMinConfig {
    fn default() -> Self {
        Self { taps: 50, packets: 200, suffix: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinMinConfig {
    pub width: usize,
    pub suffix: Option<String>,
}

impl Default for MinMinConfig {
    fn default() -> Self {
        Self { width: 40, suffix: None }
    }
}

/// Heartbeat-synced accumulator; `width` in batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatAccumulatorConfig {
    pub width: usize,
    pub suffix: Option<String>,
}

impl Default for HeartbeatAccumulatorConfig {
    fn default() -> Self {
        Self { width: 20, suffix: None }
    }
}

/// Plain accumulator; `width` in batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulatorConfig {
    pub width: usize,
    pub suffix: Option<String>,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self { width: 40, suffix: Some("u".to_string()) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IsoluminanceConfig {
    pub width: usize,
    pub lowest: usize,
    pub offset: f64,
    pub floor: f64,
    pub suffix: Option<String>,
}

impl Default for IsoluminanceConfig {
    fn default() -> Self {
        Self {
            width: 200,
            lowest: isoluminance::DEFAULT_LOWEST,
            offset: isoluminance::DEFAULT_OFFSET,
            floor: isoluminance::DEFAULT_FLOOR,
            suffix: None,
        }
    }
}

impl EstimatorConfig {
    /// Default heartbeat-synced accumulator (width 20, `sum1Hz` output).
    pub fn sum_one_hertz() -> Self {
        EstimatorConfig::HeartbeatSyncedAccumulator(HeartbeatAccumulatorConfig::default())
    }

    /// Short variant name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            EstimatorConfig::TrimmedSortSum(_) => "trimmed_sort_sum",
            EstimatorConfig::Percentile(_) => "percentile",
            EstimatorConfig::Median(_) => "median",
            EstimatorConfig::RollingMean(_) => "rolling_mean",
            EstimatorConfig::ConvolutionMin(_) => "convolution_min",
            EstimatorConfig::MinMin(_) => "min_min",
            EstimatorConfig::HeartbeatSyncedAccumulator(_) => "heartbeat_synced_accumulator",
            EstimatorConfig::Accumulator(_) => "accumulator",
            EstimatorConfig::Isoluminance(_) => "isoluminance",
        }
    }

    /// Construct the estimator. Invalid parameters are configuration errors.
    pub fn build(&self) -> Result<Box<dyn Estimator>> {
        let estimator: Box<dyn Estimator> = match self {
            EstimatorConfig::TrimmedSortSum(c) => {
                Box::new(TrimmedSortSum::from_ensembles(c.width, c.sum_width, c.samples_per_batch)?)
            }
            EstimatorConfig::Percentile(c) => Box::new(Percentile::new(c.width, c.percentile)?),
            EstimatorConfig::Median(c) => Box::new(Percentile::median(c.width)?),
            EstimatorConfig::RollingMean(c) => Box::new(RollingMean::new(c.width)?),
            EstimatorConfig::ConvolutionMin(c) => {
                Box::new(ConvolutionMinTracker::new(c.taps, c.packets)?)
            }
            EstimatorConfig::MinMin(c) => Box::new(MinMin::new(c.width)?),
            EstimatorConfig::HeartbeatSyncedAccumulator(c) => {
                Box::new(Accumulator::heartbeat_synced(c.width)?)
            }
            EstimatorConfig::Accumulator(c) => Box::new(Accumulator::new(c.width)?),
            EstimatorConfig::Isoluminance(c) => {
                Box::new(IsoluminanceAverager::new(c.width, c.lowest, c.offset, c.floor)?)
            }
        };
        Ok(estimator)
    }

    /// Output channel for an input channel under this configuration.
    pub fn output_channel(&self, input: &str) -> String {
        if let Some(suffix) = self.suffix() {
            return with_user_suffix(input, suffix);
        }

        match self {
            EstimatorConfig::TrimmedSortSum(_) => with_user_suffix(input, "u"),
            EstimatorConfig::Percentile(c) => format!("{}{}p{}w", input, c.percentile, c.width),
            EstimatorConfig::Median(c) => format!("{}{}f", input, c.width),
            EstimatorConfig::RollingMean(c) => format!("{}{}mean", input, c.width),
            EstimatorConfig::ConvolutionMin(c) => format!("{}{}fir", input, c.packets),
            EstimatorConfig::MinMin(c) => format!("{}{}mm", input, c.width),
            EstimatorConfig::HeartbeatSyncedAccumulator(_) => format!("{}sum1Hz", input),
            EstimatorConfig::Accumulator(_) => with_user_suffix(input, "u"),
            EstimatorConfig::Isoluminance(c) => format!("{}{}iaf", input, c.width),
        }
    }

    fn suffix(&self) -> Option<&str> {
        let suffix = match self {
            EstimatorConfig::TrimmedSortSum(c) => &c.suffix,
            EstimatorConfig::Percentile(c) => &c.suffix,
            EstimatorConfig::Median(c) => &c.suffix,
            EstimatorConfig::RollingMean(c) => &c.suffix,
            EstimatorConfig::ConvolutionMin(c) => &c.suffix,
            EstimatorConfig::MinMin(c) => &c.suffix,
            EstimatorConfig::HeartbeatSyncedAccumulator(c) => &c.suffix,
            EstimatorConfig::Accumulator(c) => &c.suffix,
            EstimatorConfig::Isoluminance(c) => &c.suffix,
        };
        suffix.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_channels_encode_configuration() {
        let minmin = EstimatorConfig::MinMin(MinMinConfig::default());
        assert_eq!(minmin.output_channel("RAD2d"), "RAD2d40mm");

        let percentile = EstimatorConfig::Percentile(PercentileConfig {
            percentile: 10.0,
            width: 2000,
            suffix: None,
        });
        assert_eq!(percentile.output_channel("RAD2d"), "RAD2d10p2000w");

        let fractional =
            EstimatorConfig::Percentile(PercentileConfig { percentile: 2.5, ..Default::default() });
        assert_eq!(fractional.output_channel("RAD2d"), "RAD2d2.5p2000w");

        let trimmed = EstimatorConfig::TrimmedSortSum(TrimmedSortSumConfig::default());
        assert_eq!(trimmed.output_channel("RAD1fd"), "RAD1u");

        assert_eq!(
            EstimatorConfig::ConvolutionMin(ConvolutionMinConfig::default()).output_channel("RAD2d"),
            "RAD2d200fir"
        );
        assert_eq!(
            EstimatorConfig::RollingMean(RollingMeanConfig { width: 5, suffix: None })
                .output_channel("RAD2d200fir"),
            "RAD2d200fir5mean"
        );
        assert_eq!(
            EstimatorConfig::Median(MedianConfig::default()).output_channel("RAD2d"),
            "RAD2d2000f"
        );
        assert_eq!(
            EstimatorConfig::Isoluminance(IsoluminanceConfig::default()).output_channel("RAD2d"),
            "RAD2d200iaf"
        );
        assert_eq!(EstimatorConfig::sum_one_hertz().output_channel("RAD2d"), "RAD2dsum1Hz");
    }

    #[test]
    fn suffix_override_applies_to_every_variant() {
        let fir = EstimatorConfig::ConvolutionMin(ConvolutionMinConfig {
            suffix: Some("u".into()),
            ..Default::default()
        });
        assert_eq!(fir.output_channel("RAD1fd"), "RAD1u");
    }

    #[test]
    fn distinct_configurations_never_collide() {
        let a = EstimatorConfig::MinMin(MinMinConfig { width: 40, suffix: None });
        let b = EstimatorConfig::MinMin(MinMinConfig { width: 41, suffix: None });
        assert_ne!(a.output_channel("RAD2d"), b.output_channel("RAD2d"));
    }

    #[test]
    fn yaml_fills_in_defaults() {
        let config: EstimatorConfig = serde_yaml_ng::from_str("kind: convolution_min").unwrap();
        assert_eq!(config, EstimatorConfig::ConvolutionMin(ConvolutionMinConfig::default()));

        let config: EstimatorConfig =
            serde_yaml_ng::from_str("kind: percentile\npercentile: 10\nwidth: 500").unwrap();
        match &config {
            EstimatorConfig::Percentile(c) => {
                assert_eq!(c.percentile, 10.0);
                assert_eq!(c.width, 500);
            }
            other => panic!("Expected percentile, got {other:?}"),
        }
        assert_eq!(config.name(), "percentile");
    }

    #[test]
    fn invalid_parameters_fail_to_build() {
        let zero = EstimatorConfig::MinMin(MinMinConfig { width: 0, suffix: None });
        assert!(zero.build().is_err());

        let bad = EstimatorConfig::Percentile(PercentileConfig {
            percentile: 150.0,
            ..Default::default()
        });
        assert!(bad.build().is_err());

        let built = EstimatorConfig::TrimmedSortSum(TrimmedSortSumConfig::default()).build().unwrap();
        assert_eq!(built.window_capacity(), 10_000);
    }
}
