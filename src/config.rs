//! Daemon configuration.
//!
//! One YAML document describes the single role a daemon process plays. Every
//! field has a default matching the deployed daemons, and the whole document
//! is validated once at load.
//!
//! ```yaml
//! role: estimator
//! channel: RAD2d
//! estimator:
//!   kind: percentile
//!   percentile: 10
//!   width: 2000
//! not_full_logging: verbose
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::channel::device_prefix;
use crate::decode::{DEFAULT_PERCENT_SCALE, DEFAULT_TIME_HIGH_SCALE, DecoderConfig};
use crate::driver::BridgeSettings;
use crate::estimators::{EstimatorConfig, NotFullLogging};
use crate::framing::SyncPreset;
use crate::source::{DEFAULT_BAUD_RATE, SerialSettings};
use crate::stages::TransformKind;
use crate::{RadiometerError, Result};

/// The role of one daemon process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum DaemonConfig {
    Bridge(BridgeConfig),
    Estimator(EstimatorDaemonConfig),
    Transform(TransformConfig),
}

impl DaemonConfig {
    /// Load and validate a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| RadiometerError::io(format!("reading config {}", path.display()), e))?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: DaemonConfig = serde_yaml_ng::from_str(text)
            .map_err(|e| RadiometerError::config(format!("YAML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            DaemonConfig::Bridge(bridge) => bridge.validate(),
            DaemonConfig::Estimator(estimator) => estimator.validate(),
            DaemonConfig::Transform(transform) => transform.validate(),
        }
    }
}

/// Serial bridge: one instrument onto the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Serial device path
    pub device: Option<String>,
    /// Capture file replayed instead of a live device
    pub capture: Option<PathBuf>,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    /// Channel prefix; defaults to `RAD` + last character of the device path
    pub prefix: Option<String>,
    pub sync: SyncPreset,
    pub scale: f64,
    pub percent_scale: f64,
    pub publish_unknown: bool,
    /// Replay speed multiplier for captures
    pub replay_speed: f64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            device: None,
            capture: None,
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: 1000,
            prefix: None,
            sync: SyncPreset::Mesobot,
            scale: DEFAULT_TIME_HIGH_SCALE,
            percent_scale: DEFAULT_PERCENT_SCALE,
            publish_unknown: true,
            replay_speed: 1.0,
        }
    }
}

impl BridgeConfig {
    /// Live bridge for a device with every other field defaulted.
    pub fn for_device(device: impl Into<String>) -> Self {
        Self { device: Some(device.into()), ..Self::default() }
    }

    pub fn validate(&self) -> Result<()> {
        match (&self.device, &self.capture) {
            (Some(_), Some(_)) => {
                return Err(RadiometerError::config("set either device or capture, not both"));
            }
            (None, None) => return Err(RadiometerError::config("bridge needs a device or a capture")),
            (None, Some(_)) if self.prefix.is_none() => {
                return Err(RadiometerError::config("capture replay needs an explicit prefix"));
            }
            _ => {}
        }
        if self.baud_rate == 0 {
            return Err(RadiometerError::config("baud_rate must be positive"));
        }
        if !(self.scale.is_finite() && self.percent_scale.is_finite()) {
            return Err(RadiometerError::config("scales must be finite"));
        }
        if !(self.replay_speed > 0.0) {
            return Err(RadiometerError::config("replay_speed must be positive"));
        }
        Ok(())
    }

    /// Channel prefix in effect.
    pub fn prefix(&self) -> String {
        match (&self.prefix, &self.device) {
            (Some(prefix), _) => prefix.clone(),
            (None, Some(device)) => device_prefix(device),
            (None, None) => device_prefix(""),
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Serial settings, when bridging a live device.
    pub fn serial_settings(&self) -> Option<SerialSettings> {
        self.device.as_ref().map(|device| SerialSettings {
            device: device.clone(),
            baud_rate: self.baud_rate,
            read_timeout: self.read_timeout(),
        })
    }

    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            heartbeat_layout: self.sync.heartbeat_layout(),
            scale: self.scale,
            percent_scale: self.percent_scale,
        }
    }

    pub fn bridge_settings(&self) -> BridgeSettings {
        BridgeSettings {
            prefix: self.prefix(),
            decoder: self.decoder_config(),
            publish_unknown: self.publish_unknown,
        }
    }
}

/// One estimator over one input channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorDaemonConfig {
    #[serde(default = "default_estimator_channel")]
    pub channel: String,
    pub estimator: EstimatorConfig,
    #[serde(default)]
    pub not_full_logging: NotFullLogging,
}

fn default_estimator_channel() -> String {
    "RAD2d".to_string()
}

impl EstimatorDaemonConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channel.is_empty() {
            return Err(RadiometerError::config("estimator channel must not be empty"));
        }
        self.estimator.build().map(|_| ())
    }
}

/// One per-sample transform over one input channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default = "default_transform_channel")]
    pub channel: String,
    pub kind: TransformKind,
    /// Multiplier for `percent_full_scale`; match the bridge's `percent_scale`
    #[serde(default = "default_transform_percent_scale")]
    pub percent_scale: f64,
}

fn default_transform_channel() -> String {
    "RAD1t".to_string()
}

fn default_transform_percent_scale() -> f64 {
    DEFAULT_PERCENT_SCALE
}

impl TransformConfig {
    pub fn validate(&self) -> Result<()> {
        if self.channel.is_empty() {
            return Err(RadiometerError::config("transform channel must not be empty"));
        }
        if !self.percent_scale.is_finite() {
            return Err(RadiometerError::config("transform percent_scale must be finite"));
        }
        Ok(())
    }
}
