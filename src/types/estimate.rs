//! Estimator output

/// One published ambient estimate. Never retracted.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateResult {
    /// Timestamp of the input that completed the estimate, microseconds
    pub utime: i64,
    /// Estimated value
    pub value: f64,
    /// Bus channel the estimate is published on
    pub output_channel: String,
}

impl EstimateResult {
    /// Create a new result
    pub fn new(utime: i64, value: f64, output_channel: impl Into<String>) -> Self {
        Self { utime, value, output_channel: output_channel.into() }
    }
}
