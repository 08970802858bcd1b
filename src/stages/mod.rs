//! Pipeline stages: subscribe, transform, republish.
//!
//! A [`PipelineStage`] turns one bus message into zero or more outbound
//! messages. [`StageRunner`] drives a stage against a [`MessageBus`], handling
//! each message to completion before awaiting the next, so a stage's state is
//! only ever touched from one task.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::bus::{Envelope, MessageBus};
use crate::{RadiometerError, Result};

mod estimate;
mod transform;

pub use estimate::EstimatorStage;
pub use transform::{TransformKind, TransformStage};

/// A message ready to publish.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub channel: String,
    pub payload: Vec<u8>,
}

impl Outbound {
    pub fn new(channel: impl Into<String>, payload: Vec<u8>) -> Self {
        Self { channel: channel.into(), payload }
    }
}

/// One process-hosted filter in the pipeline graph.
pub trait PipelineStage: Send + 'static {
    /// Name for logs.
    fn name(&self) -> &str;

    /// Channels this stage consumes.
    fn input_channels(&self) -> Vec<String>;

    /// Handle one delivered message.
    fn handle(&mut self, envelope: &Envelope) -> Result<Vec<Outbound>>;
}

/// Counters returned when a stage stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStats {
    pub received: u64,
    pub published: u64,
    pub errors: u64,
}

/// Handle to a running stage
pub struct StageHandle {
    pub cancel: CancellationToken,
    task: JoinHandle<StageStats>,
}

impl StageHandle {
    /// Wait for the stage to stop.
    pub async fn join(self) -> Result<StageStats> {
        self.task
            .await
            .map_err(|e| RadiometerError::io("joining stage", std::io::Error::other(e.to_string())))
    }

    /// Cancel the stage, unsubscribe, and wait for it to stop.
    pub async fn shutdown(self) -> Result<StageStats> {
        self.cancel.cancel();
        self.join().await
    }
}

/// Drives a [`PipelineStage`] against a bus.
pub struct StageRunner;

impl StageRunner {
    /// Subscribe the stage's inputs and spawn its task.
    ///
    /// Subscribing happens before this returns, so messages published after
    /// `spawn` are never missed.
    pub fn spawn<S, B>(stage: S, bus: B, cancel: CancellationToken) -> Result<StageHandle>
    where
        S: PipelineStage,
        B: MessageBus,
    {
        let channels = stage.input_channels();
        let subscription = bus.subscribe(&channels)?;
        info!(stage = stage.name(), channels = ?channels, "Stage subscribed");

        let task_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let mut stage = stage;
            let mut subscription = subscription;
            let mut stats = StageStats::default();

            loop {
                let envelope = tokio::select! {
                    _ = task_cancel.cancelled() => {
                        info!(stage = stage.name(), "Stage cancelled");
                        break;
                    }
                    envelope = subscription.recv() => match envelope {
                        Some(envelope) => envelope,
                        None => break,
                    },
                };
                stats.received += 1;

                let outbound = match stage.handle(&envelope) {
                    Ok(outbound) => outbound,
                    Err(e) => {
                        stats.errors += 1;
                        warn!(stage = stage.name(), channel = %envelope.channel, "Dropped message: {}", e);
                        continue;
                    }
                };

                for message in outbound {
                    match bus.publish(&message.channel, message.payload) {
                        Ok(()) => stats.published += 1,
                        Err(e) => {
                            stats.errors += 1;
                            warn!(stage = stage.name(), "Publish failed: {}", e);
                        }
                    }
                }
            }

            drop(subscription);
            debug!(
                stage = stage.name(),
                received = stats.received,
                published = stats.published,
                "Stage stopped"
            );
            stats
        });

        Ok(StageHandle { cancel, task })
    }
}
