//! Serial acquisition and ambient-light estimation for an underwater radiometer.
//!
//! The radiometer streams fixed-size binary packets over a serial line, each
//! introduced by a multi-byte sync token. This crate frames that byte stream
//! into packets, decodes them, publishes the resulting streams on a
//! channel-addressed message bus, and runs sliding-window estimators that turn
//! a high-rate photon-count stream into a low-rate ambient irradiance estimate.
//!
//! # Pipeline
//!
//! ```text
//! serial bytes ─► PacketFramer ─► BridgeDriver ─► {prefix}o / h / r / t / p
//!                                                      │
//!                       TransformStage / EstimatorStage ◄┘ ─► derived channels
//! ```
//!
//! - [`framing`]: sync-token state machine, tolerant of garbage and truncation
//! - [`decode`]: fixed payload layouts and scaled sample streams
//! - [`estimators`]: the windowed estimator family and its configuration
//! - [`bus`] / [`stages`]: the publish/subscribe plumbing between processes
//!
//! ## Example (capture replay)
//!
//! ```rust,no_run
//! use radiometer::{BridgeConfig, LocalBus, MessageBus, Radiometer};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> radiometer::Result<()> {
//!     let bus = LocalBus::new();
//!     let mut sub = bus.subscribe(&["RAD1t".to_string()])?;
//!
//!     let config = BridgeConfig {
//!         capture: Some("dive042.bin".into()),
//!         prefix: Some("RAD1".into()),
//!         ..Default::default()
//!     };
//!     let bridge = Radiometer::bridge(&config, bus.clone(), CancellationToken::new())?;
//!
//!     while let Some(envelope) = sub.recv().await {
//!         println!("{} bytes on {}", envelope.payload.len(), envelope.channel);
//!     }
//!     bridge.shutdown().await?;
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Wire layer
pub mod channel;
pub mod decode;
pub mod framing;
pub mod source;

// Filtering
pub mod estimators;

// Bus-facing architecture
pub mod bus;
pub mod driver;
pub mod provider;
pub mod providers;
pub mod stages;

// Daemon support
pub mod config;
pub mod logging;

// Core exports
pub use error::*;
pub use types::*;

pub use bus::{Envelope, LocalBus, MessageBus, Subscription};
pub use config::{BridgeConfig, DaemonConfig, EstimatorDaemonConfig, TransformConfig};
pub use decode::{Decoded, DecoderConfig, PacketDecoder};
pub use driver::{BridgeDriver, BridgeHandle, BridgeSettings, BridgeStats};
pub use estimators::{ConfiguredEstimator, Estimator, EstimatorConfig, EstimatorInput};
pub use framing::{FrameEvent, PacketFramer, SyncPreset, SyncTable};
pub use provider::Provider;
pub use providers::{ReplayProvider, SerialProvider};
pub use stages::{EstimatorStage, PipelineStage, StageHandle, StageRunner, TransformStage};

use tokio_util::sync::CancellationToken;
use tracing::info;

use source::SerialPortSink;

/// A running daemon role.
pub enum RoleHandle {
    Bridge(BridgeHandle),
    Stage(StageHandle),
}

impl RoleHandle {
    /// Wait for the role to stop on its own.
    pub async fn join(self) -> Result<()> {
        match self {
            RoleHandle::Bridge(handle) => {
                let stats = handle.join().await?;
                info!(?stats, "Bridge stopped");
            }
            RoleHandle::Stage(handle) => {
                let stats = handle.join().await?;
                info!(?stats, "Stage stopped");
            }
        }
        Ok(())
    }

    /// Cancel the role and wait for it.
    pub async fn shutdown(self) -> Result<()> {
        match &self {
            RoleHandle::Bridge(handle) => handle.cancel.cancel(),
            RoleHandle::Stage(handle) => handle.cancel.cancel(),
        }
        self.join().await
    }
}

/// Unified entry point for starting daemon roles.
///
/// Every method must be called from inside a Tokio runtime. The returned
/// handles stop when `cancel` fires.
pub struct Radiometer;

impl Radiometer {
    /// Start whichever role `config` describes.
    pub fn launch<B>(config: &DaemonConfig, bus: B, cancel: CancellationToken) -> Result<RoleHandle>
    where
        B: MessageBus + Clone,
    {
        match config {
            DaemonConfig::Bridge(bridge) => Self::bridge(bridge, bus, cancel).map(RoleHandle::Bridge),
            DaemonConfig::Estimator(estimator) => {
                Self::estimator(estimator, bus, cancel).map(RoleHandle::Stage)
            }
            DaemonConfig::Transform(transform) => {
                Self::transform(transform, bus, cancel).map(RoleHandle::Stage)
            }
        }
    }

    /// Bridge a serial device, or replay a capture, onto the bus.
    ///
    /// A live device also gets a command path: raw bytes published on
    /// `{prefix}i` are written to the instrument.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the serial device
    /// cannot be opened, or the capture cannot be read.
    pub fn bridge<B>(config: &BridgeConfig, bus: B, cancel: CancellationToken) -> Result<BridgeHandle>
    where
        B: MessageBus + Clone,
    {
        config.validate()?;
        let settings = config.bridge_settings();
        let table = config.sync.table();

        if let Some(serial) = config.serial_settings() {
            let (source, sink) = source::open_serial(&serial)?;
            let framer = PacketFramer::new(source, table).with_read_timeout(serial.read_timeout);
            let provider = SerialProvider::spawn(serial.device.clone(), framer, cancel.clone());
            return BridgeDriver::spawn(provider, bus, Some(sink), settings, cancel);
        }

        let path = config
            .capture
            .as_ref()
            .ok_or_else(|| RadiometerError::config("bridge needs a device or a capture"))?;
        let mut provider = ReplayProvider::open(path, table)?;
        provider.set_speed(config.replay_speed);
        BridgeDriver::spawn(provider, bus, None::<SerialPortSink>, settings, cancel)
    }

    /// Run one estimator over one channel.
    pub fn estimator<B>(
        config: &EstimatorDaemonConfig,
        bus: B,
        cancel: CancellationToken,
    ) -> Result<StageHandle>
    where
        B: MessageBus,
    {
        let stage = EstimatorStage::new(&config.channel, &config.estimator, config.not_full_logging)?;
        info!(input = %config.channel, output = stage.output_channel(), "Starting estimator");
        StageRunner::spawn(stage, bus, cancel)
    }

    /// Run one per-sample transform over one channel.
    pub fn transform<B>(config: &TransformConfig, bus: B, cancel: CancellationToken) -> Result<StageHandle>
    where
        B: MessageBus,
    {
        let stage = TransformStage::from_config(config);
        info!(input = %config.channel, output = stage.output_channel(), "Starting transform");
        StageRunner::spawn(stage, bus, cancel)
    }
}
