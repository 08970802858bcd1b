//! Radiometer daemon
//!
//! Hosts one or more pipeline roles on an in-process bus:
//!
//! ```bash
//! # Bridge a live instrument, logging its transformed stream
//! radiometerd bridge /dev/ttyUSB1 --tap RAD1t
//!
//! # Bridge plus estimators, one YAML document per role
//! radiometerd run config/bridge.yaml config/percentile.yaml
//!
//! # Validate configs and print the channels they produce
//! radiometerd check config/*.yaml
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use radiometer::bus::BusPayload;
use radiometer::channel::DeviceRole;
use radiometer::{
    BridgeConfig, DaemonConfig, Envelope, LocalBus, MessageBus, Radiometer, SyncPreset, TransformStage,
    logging,
};

#[derive(Parser)]
#[command(name = "radiometerd")]
#[command(about = "Radiometer serial bridge and ambient-light estimators", long_about = None)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bridge a serial device (or replay a capture) onto the bus
    Bridge(BridgeArgs),

    /// Run every role described by the given config files
    Run {
        /// YAML config files, one role each
        #[arg(required = true)]
        configs: Vec<PathBuf>,

        /// Log every message published on these channels
        #[arg(long)]
        tap: Vec<String>,
    },

    /// Validate config files without starting anything
    Check {
        #[arg(required = true)]
        configs: Vec<PathBuf>,
    },
}

#[derive(Args)]
struct BridgeArgs {
    /// Serial device path
    device: Option<String>,

    /// Replay a capture file instead of a device
    #[arg(long, conflicts_with = "device")]
    capture: Option<PathBuf>,

    #[arg(long, default_value_t = radiometer::source::DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Channel prefix (default: RAD + last character of the device path)
    #[arg(long)]
    prefix: Option<String>,

    /// Use the legacy firmware sync tokens
    #[arg(long)]
    legacy: bool,

    /// Replay speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Log every message published on these channels
    #[arg(long)]
    tap: Vec<String>,
}

impl BridgeArgs {
    fn config(&self) -> BridgeConfig {
        BridgeConfig {
            device: self.device.clone(),
            capture: self.capture.clone(),
            baud_rate: self.baud,
            prefix: self.prefix.clone(),
            sync: if self.legacy { SyncPreset::Legacy } else { SyncPreset::Mesobot },
            replay_speed: self.speed,
            ..BridgeConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Bridge(args) => {
            let config = DaemonConfig::Bridge(args.config());
            serve(vec![config], args.tap).await
        }
        Commands::Run { configs, tap } => serve(load_all(&configs)?, tap).await,
        Commands::Check { configs } => check(&configs),
    }
}

fn load_all(paths: &[PathBuf]) -> Result<Vec<DaemonConfig>> {
    paths
        .iter()
        .map(|path| {
            DaemonConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
        })
        .collect()
}

fn check(paths: &[PathBuf]) -> Result<()> {
    for (path, config) in paths.iter().zip(load_all(paths)?) {
        let outputs = match &config {
            DaemonConfig::Bridge(bridge) => {
                let settings = bridge.bridge_settings();
                [
                    DeviceRole::Output,
                    DeviceRole::Heartbeat,
                    DeviceRole::Resync,
                    DeviceRole::Transformed,
                    DeviceRole::Percent,
                ]
                .map(|role| settings.channel(role))
                .join(", ")
            }
            DaemonConfig::Estimator(estimator) => {
                estimator.estimator.output_channel(&estimator.channel)
            }
            DaemonConfig::Transform(transform) => {
                TransformStage::from_config(transform).output_channel().to_string()
            }
        };
        println!("{}: ok -> {}", path.display(), outputs);
    }
    Ok(())
}

async fn serve(configs: Vec<DaemonConfig>, tap: Vec<String>) -> Result<()> {
    let bus = LocalBus::new();
    let cancel = CancellationToken::new();

    // Stages subscribe before the bridge starts publishing.
    let mut ordered = configs;
    ordered.sort_by_key(|config| matches!(config, DaemonConfig::Bridge(_)));

    let tap_task = if tap.is_empty() {
        None
    } else {
        let mut subscription = bus.subscribe(&tap).context("subscribing tap channels")?;
        let tap_cancel = cancel.clone();
        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tap_cancel.cancelled() => break,
                    envelope = subscription.recv() => match envelope {
                        Some(envelope) => log_envelope(&envelope),
                        None => break,
                    },
                }
            }
        }))
    };

    let mut roles = Vec::with_capacity(ordered.len());
    for config in &ordered {
        let role = Radiometer::launch(config, bus.clone(), cancel.clone())
            .map_err(|e| {
                for suggestion in e.recovery_suggestions() {
                    error!("  - {}", suggestion);
                }
                e
            })
            .context("starting role")?;
        roles.push(role);
    }
    info!(roles = roles.len(), "Radiometer daemon running, Ctrl-C to stop");

    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("Shutting down");
    cancel.cancel();

    for role in roles {
        if let Err(e) = role.shutdown().await {
            error!("Role stopped with error: {}", e);
        }
    }
    if let Some(task) = tap_task {
        join_logged("tap", task).await;
    }
    Ok(())
}

/// Await a helper task, logging a panic or abort instead of dropping it.
async fn join_logged(name: &str, task: JoinHandle<()>) -> bool {
    match task.await {
        Ok(()) => true,
        Err(e) => {
            error!(task = name, "Task failed: {}", e);
            false
        }
    }
}

fn log_envelope(envelope: &Envelope) {
    match BusPayload::decode(&envelope.payload) {
        Ok(BusPayload::Floats(message)) => {
            let first = message.data.first().copied().unwrap_or(f64::NAN);
            info!(channel = %envelope.channel, utime = message.utime, n = message.data.len(), first, "floats");
        }
        Ok(BusPayload::Estimate(message)) => {
            info!(
                channel = %envelope.channel,
                utime = message.utime,
                value = message.downwelling_photon_spherical_irradiance,
                "estimate"
            );
        }
        Ok(BusPayload::Raw(message)) => {
            info!(channel = %envelope.channel, utime = message.utime, bytes = message.data.len(), "raw");
        }
        Err(e) => {
            info!(channel = %envelope.channel, bytes = envelope.payload.len(), "unrecognized payload: {}", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_reports_panicked_task() {
        let clean = tokio::spawn(async {});
        assert!(join_logged("clean", clean).await);

        let panicked = tokio::spawn(async { panic!("tap exploded") });
        assert!(!join_logged("tap", panicked).await);
    }

    #[test]
    fn check_derives_transform_output_with_configured_scale() {
        let yaml = "role: transform\nkind: percent_full_scale\npercent_scale: 1.0e-3";
        let config = DaemonConfig::from_yaml_str(yaml).unwrap();
        let DaemonConfig::Transform(transform) = config else { panic!("Expected transform role") };
        assert_eq!(TransformStage::from_config(&transform).output_channel(), "RAD1p");
    }
}
