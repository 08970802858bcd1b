//! Per-sample transform stages

use serde::{Deserialize, Serialize};

use super::{Outbound, PipelineStage};
use crate::Result;
use crate::bus::{BusPayload, Envelope};
use crate::channel::with_user_suffix;
use crate::config::TransformConfig;
use crate::decode::DEFAULT_PERCENT_SCALE;

/// Which transform to apply to each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Time-high counts to percent of full scale (× `percent_scale`), published on `p`
    PercentFullScale,
    /// Time-high counts to photon flux density, published on `fd`
    ///
    /// The instrument calibration is not known yet, so this is the identity.
    PhotonFlux,
}

impl TransformKind {
    pub fn suffix(self) -> &'static str {
        match self {
            TransformKind::PercentFullScale => "p",
            TransformKind::PhotonFlux => "fd",
        }
    }
}

/// Applies a [`TransformKind`] to every sample of every batch.
#[derive(Debug, Clone)]
pub struct TransformStage {
    input_channel: String,
    output_channel: String,
    kind: TransformKind,
    percent_scale: f64,
}

impl TransformStage {
    pub fn new(input_channel: impl Into<String>, kind: TransformKind) -> Self {
        let input_channel = input_channel.into();
        let output_channel = with_user_suffix(&input_channel, kind.suffix());
        Self { input_channel, output_channel, kind, percent_scale: DEFAULT_PERCENT_SCALE }
    }

    pub fn from_config(config: &TransformConfig) -> Self {
        Self::new(&config.channel, config.kind).with_percent_scale(config.percent_scale)
    }

    /// Override the percent-of-full-scale multiplier.
    pub fn with_percent_scale(mut self, percent_scale: f64) -> Self {
        self.percent_scale = percent_scale;
        self
    }

    pub fn apply(&self, value: f64) -> f64 {
        match self.kind {
            TransformKind::PercentFullScale => value * self.percent_scale,
            TransformKind::PhotonFlux => value,
        }
    }

    pub fn output_channel(&self) -> &str {
        &self.output_channel
    }
}

impl PipelineStage for TransformStage {
    fn name(&self) -> &str {
        self.kind.suffix()
    }

    fn input_channels(&self) -> Vec<String> {
        vec![self.input_channel.clone()]
    }

    fn handle(&mut self, envelope: &Envelope) -> Result<Vec<Outbound>> {
        let mut floats = BusPayload::decode(&envelope.payload)?.into_floats()?;
        for value in &mut floats.data {
            *value = self.apply(*value);
        }
        let payload = BusPayload::Floats(floats).encode()?;
        Ok(vec![Outbound::new(self.output_channel.clone(), payload)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::FloatsMessage;
    use std::sync::Arc;

    fn run(stage: &mut TransformStage, input: FloatsMessage) -> (String, FloatsMessage) {
        let payload = BusPayload::Floats(input).encode().unwrap();
        let mut out = stage
            .handle(&Envelope { channel: "RAD1t".into(), payload: Arc::from(payload) })
            .unwrap();
        let outbound = out.remove(0);
        let floats = BusPayload::decode(&outbound.payload).unwrap().into_floats().unwrap();
        (outbound.channel, floats)
    }

    #[test]
    fn percent_scaler_publishes_on_p() {
        let mut stage = TransformStage::new("RAD1t", TransformKind::PercentFullScale);
        let (channel, floats) = run(&mut stage, FloatsMessage { utime: 9, data: vec![1600.0, 0.0] });

        assert_eq!(channel, "RAD1p");
        assert_eq!(floats.utime, 9);
        assert!((floats.data[0] - 0.16).abs() < 1e-12);
    }

    #[test]
    fn percent_scaler_uses_configured_scale() {
        let config = TransformConfig {
            channel: "RAD1t".into(),
            kind: TransformKind::PercentFullScale,
            percent_scale: 1e-3,
        };
        let mut stage = TransformStage::from_config(&config);
        let (channel, floats) = run(&mut stage, FloatsMessage { utime: 2, data: vec![100.0] });

        assert_eq!(channel, "RAD1p");
        assert!((floats.data[0] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn photon_flux_is_identity_on_fd() {
        let mut stage =
            TransformStage::new("RAD1t", TransformKind::PhotonFlux).with_percent_scale(1e-3);
        assert_eq!(stage.output_channel(), "RAD1fd");

        let input = FloatsMessage { utime: 1, data: vec![3.5] };
        let (_, floats) = run(&mut stage, input.clone());
        assert_eq!(floats, input);
    }

    #[test]
    fn non_float_payloads_are_codec_errors() {
        let mut stage = TransformStage::new("RAD1t", TransformKind::PhotonFlux);
        let raw = BusPayload::Raw(crate::bus::RawBytesMessage { utime: 0, data: vec![1] });
        let err = stage
            .handle(&Envelope { channel: "RAD1t".into(), payload: Arc::from(raw.encode().unwrap()) })
            .unwrap_err();
        assert!(matches!(err, crate::RadiometerError::Codec { .. }));
    }
}
