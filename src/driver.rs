//! Serial bridge driver: framed packets in, bus messages out

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::bus::{BusPayload, FloatsMessage, MessageBus, RawBytesMessage};
use crate::channel::{DeviceRole, device_channel};
use crate::decode::{Decoded, DecoderConfig, PacketDecoder};
use crate::framing::FrameEvent;
use crate::provider::Provider;
use crate::source::ByteSink;
use crate::types::{HeartbeatRecord, Packet, PacketKind};
use crate::{RadiometerError, Result};

/// Consecutive provider errors tolerated before the bridge gives up.
const MAX_ERRORS: u32 = 10;

/// What the bridge publishes and under which prefix.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeSettings {
    /// Channel prefix, e.g. `RAD1`
    pub prefix: String,
    pub decoder: DecoderConfig,
    /// Republish unmatched token windows on `{prefix}r`
    pub publish_unknown: bool,
}

impl BridgeSettings {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), decoder: DecoderConfig::default(), publish_unknown: true }
    }

    pub fn channel(&self, role: DeviceRole) -> String {
        device_channel(&self.prefix, role)
    }
}

/// Per-run counters returned when the bridge stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub data: u64,
    pub heartbeats: u64,
    pub unknown: u64,
    pub short_reads: u64,
    pub decode_errors: u64,
    pub commands: u64,
}

/// Handle to a running bridge
pub struct BridgeHandle {
    /// Most recent decoded heartbeat
    pub heartbeats: watch::Receiver<Option<HeartbeatRecord>>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
    reader: JoinHandle<BridgeStats>,
    commands: Option<JoinHandle<u64>>,
}

impl BridgeHandle {
    /// Wait for the bridge to stop on its own (source exhausted or too many errors).
    pub async fn join(self) -> Result<BridgeStats> {
        let mut stats = self
            .reader
            .await
            .map_err(|e| RadiometerError::io("joining bridge", std::io::Error::other(e.to_string())))?;

        self.cancel.cancel();
        if let Some(commands) = self.commands {
            stats.commands = commands.await.unwrap_or_default();
        }
        Ok(stats)
    }

    /// Cancel and wait for both tasks.
    pub async fn shutdown(self) -> Result<BridgeStats> {
        self.cancel.cancel();
        self.join().await
    }
}

/// Bridges a framed packet source onto the bus
///
/// Spawns a packet task that owns the provider and publishes every framed
/// packet, and optionally a command task that forwards `{prefix}i` messages to
/// the instrument.
pub struct BridgeDriver;

impl BridgeDriver {
    /// Spawn the bridge tasks
    pub fn spawn<P, B, K>(
        provider: P,
        bus: B,
        sink: Option<K>,
        settings: BridgeSettings,
        cancel: CancellationToken,
    ) -> Result<BridgeHandle>
    where
        P: Provider,
        B: MessageBus + Clone,
        K: ByteSink + 'static,
    {
        let (heartbeat_tx, heartbeat_rx) = watch::channel(None);

        let commands = match sink {
            Some(sink) => {
                let inbound = settings.channel(DeviceRole::Inbound);
                let subscription = bus.subscribe(std::slice::from_ref(&inbound))?;
                let cancel_commands = cancel.clone();
                Some(tokio::spawn(async move {
                    Self::command_task(inbound, subscription, sink, cancel_commands).await
                }))
            }
            None => None,
        };

        let cancel_reader = cancel.clone();
        let reader = tokio::spawn(async move {
            Self::packet_task(provider, bus, settings, heartbeat_tx, cancel_reader).await
        });

        Ok(BridgeHandle { heartbeats: heartbeat_rx, cancel, reader, commands })
    }

    /// Packet task - reads framed events and publishes them
    async fn packet_task<P, B>(
        mut provider: P,
        bus: B,
        settings: BridgeSettings,
        heartbeat_tx: watch::Sender<Option<HeartbeatRecord>>,
        cancel: CancellationToken,
    ) -> BridgeStats
    where
        P: Provider,
        B: MessageBus,
    {
        info!(source = provider.source_name(), prefix = %settings.prefix, "Bridge started");
        let decoder = PacketDecoder::new(settings.decoder);
        let mut stats = BridgeStats::default();
        let mut error_count = 0u32;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Bridge cancelled");
                    break;
                }
                result = provider.next_events() => result,
            };

            match result {
                Ok(Some(events)) => {
                    error_count = 0;
                    for event in events {
                        match event {
                            FrameEvent::Packet(packet) => {
                                if let Err(e) = Self::publish_packet(
                                    &bus,
                                    &settings,
                                    &decoder,
                                    &packet,
                                    &heartbeat_tx,
                                    &mut stats,
                                ) {
                                    warn!("Failed to publish {:?} packet: {}", packet.kind, e);
                                }
                            }
                            FrameEvent::ShortRead { kind, expected, received } => {
                                stats.short_reads += 1;
                                warn!(
                                    "Short read on {:?} payload: tried to read {} but only have {}",
                                    kind, expected, received
                                );
                            }
                        }
                    }
                }
                Ok(None) => {
                    info!("Provider stream ended after {} data packets", stats.data);
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    error!("Provider error ({}/{}): {}", error_count, MAX_ERRORS, e);

                    if error_count >= MAX_ERRORS {
                        error!("Too many provider errors, shutting down");
                        break;
                    }

                    // Exponential backoff: 100ms, 200ms, 400ms, ...
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        info!(
            data = stats.data,
            heartbeats = stats.heartbeats,
            unknown = stats.unknown,
            decode_errors = stats.decode_errors,
            "Bridge stopped"
        );
        stats
    }

    fn publish_packet<B: MessageBus>(
        bus: &B,
        settings: &BridgeSettings,
        decoder: &PacketDecoder,
        packet: &Packet,
        heartbeat_tx: &watch::Sender<Option<HeartbeatRecord>>,
        stats: &mut BridgeStats,
    ) -> Result<()> {
        match packet.kind {
            PacketKind::Data => stats.data += 1,
            PacketKind::Heartbeat => stats.heartbeats += 1,
            PacketKind::Unknown => {
                stats.unknown += 1;
                trace!("Resync byte, token {}", packet.token);
                if !settings.publish_unknown {
                    return Ok(());
                }
            }
        }

        let role = match packet.kind {
            PacketKind::Data => DeviceRole::Output,
            PacketKind::Heartbeat => DeviceRole::Heartbeat,
            PacketKind::Unknown => DeviceRole::Resync,
        };
        let raw =
            BusPayload::Raw(RawBytesMessage { utime: packet.utime, data: packet.wire_bytes() });
        bus.publish(&settings.channel(role), raw.encode()?)?;

        if packet.kind == PacketKind::Unknown {
            return Ok(());
        }

        match decoder.decode(packet) {
            Ok(Decoded::Data(record)) => {
                let time_high = decoder.time_high(&record);
                let percent = decoder.percent_full_scale(&time_high);
                bus.publish(
                    &settings.channel(DeviceRole::Transformed),
                    BusPayload::Floats(FloatsMessage::from(&time_high)).encode()?,
                )?;
                bus.publish(
                    &settings.channel(DeviceRole::Percent),
                    BusPayload::Floats(FloatsMessage::from(&percent)).encode()?,
                )?;
            }
            Ok(Decoded::Heartbeat(heartbeat)) => {
                debug!(
                    utc = heartbeat.utc_seconds,
                    pulses = heartbeat.pulse_count,
                    irradiance = heartbeat.irradiance,
                    "Heartbeat"
                );
                heartbeat_tx.send_replace(Some(heartbeat));
            }
            Err(e) => {
                stats.decode_errors += 1;
                warn!("Discarding undecodable packet: {}", e);
            }
        }
        Ok(())
    }

    /// Command task - forwards inbound command bytes to the instrument
    async fn command_task<K: ByteSink>(
        channel: String,
        mut subscription: crate::bus::Subscription,
        mut sink: K,
        cancel: CancellationToken,
    ) -> u64 {
        info!(channel = %channel, "Listening for instrument commands");
        let mut forwarded = 0u64;

        loop {
            let envelope = tokio::select! {
                _ = cancel.cancelled() => break,
                envelope = subscription.recv() => match envelope {
                    Some(envelope) => envelope,
                    None => break,
                },
            };

            let decoded = BusPayload::decode(&envelope.payload).and_then(BusPayload::into_raw);
            let command = match decoded {
                Ok(command) => command,
                Err(e) => {
                    warn!(channel = %channel, "Ignoring malformed command: {}", e);
                    continue;
                }
            };

            match sink.write_all(&command.data).and_then(|_| sink.flush()) {
                Ok(()) => {
                    forwarded += 1;
                    debug!("Forwarded {} command bytes", command.data.len());
                }
                Err(e) => warn!("Failed to write command to instrument: {}", e),
            }
        }

        forwarded
    }
}
