//! Estimator stage

use tracing::{debug, warn};

use super::{Outbound, PipelineStage};
use crate::bus::{BusPayload, Envelope, RadiometerMessage};
use crate::estimators::{ConfiguredEstimator, EstimatorConfig, EstimatorInput, NotFullLogging};
use crate::types::{SampleBatch, SampleUnit};
use crate::{RadiometerError, Result};

/// Runs one configured estimator over an input channel.
///
/// Sample batches (`FloatsMessage`) and upstream estimates
/// (`RadiometerMessage`) are both accepted on the input channel. For
/// heartbeat-synced estimators, any raw message on the companion channel
/// clears the window; a malformed one is logged and leaves it untouched.
#[derive(Debug)]
pub struct EstimatorStage {
    name: String,
    estimator: ConfiguredEstimator,
}

impl EstimatorStage {
    pub fn new(
        input_channel: impl Into<String>,
        config: &EstimatorConfig,
        not_full_logging: NotFullLogging,
    ) -> Result<Self> {
        let estimator = ConfiguredEstimator::new(input_channel, config, not_full_logging)?;
        let name = format!("{}:{}", config.name(), estimator.output_channel());
        Ok(Self { name, estimator })
    }

    pub fn output_channel(&self) -> &str {
        self.estimator.output_channel()
    }

    fn publish(&mut self, input: &EstimatorInput<'_>) -> Result<Vec<Outbound>> {
        match self.estimator.ingest(input) {
            Some(result) => {
                debug!(channel = %result.output_channel, "Estimate {}", result.value);
                let payload = BusPayload::Estimate(RadiometerMessage::from(&result)).encode()?;
                Ok(vec![Outbound::new(result.output_channel, payload)])
            }
            None => Ok(Vec::new()),
        }
    }
}

impl PipelineStage for EstimatorStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_channels(&self) -> Vec<String> {
        let mut channels = vec![self.estimator.input_channel().to_string()];
        channels.extend(self.estimator.heartbeat_channel().map(str::to_string));
        channels
    }

    fn handle(&mut self, envelope: &Envelope) -> Result<Vec<Outbound>> {
        if Some(envelope.channel.as_str()) == self.estimator.heartbeat_channel() {
            return match BusPayload::decode(&envelope.payload).and_then(BusPayload::into_raw) {
                Ok(heartbeat) => self.publish(&EstimatorInput::Heartbeat { utime: heartbeat.utime }),
                Err(e) => {
                    warn!(channel = %envelope.channel, "Heartbeat not applied: {}", e);
                    Ok(Vec::new())
                }
            };
        }

        match BusPayload::decode(&envelope.payload)? {
            BusPayload::Floats(floats) => {
                let batch = SampleBatch::new(floats.utime, floats.data, SampleUnit::PhotonFlux);
                self.publish(&EstimatorInput::Batch(&batch))
            }
            BusPayload::Estimate(estimate) => self.publish(&EstimatorInput::Scalar {
                utime: estimate.utime,
                value: estimate.downwelling_photon_spherical_irradiance,
            }),
            BusPayload::Raw(_) => Err(RadiometerError::codec(
                envelope.channel.clone(),
                "expected a floats or radiometer message",
            )),
        }
    }
}
