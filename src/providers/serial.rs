//! Provider that frames a blocking byte source on a dedicated thread

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::framing::{FrameEvent, PacketFramer};
use crate::provider::Provider;
use crate::source::ByteSource;
use crate::{RadiometerError, Result};

/// Poll batches buffered between the reader thread and the async consumer.
pub const FRAME_QUEUE_DEPTH: usize = 64;

/// Frames a [`ByteSource`] on a blocking thread and hands events to async code.
///
/// The reader thread exclusively owns the framer. When the queue is full the
/// thread blocks, so the serial driver buffers bytes rather than the framer
/// dropping packets.
pub struct SerialProvider {
    name: String,
    events: mpsc::Receiver<Result<Vec<FrameEvent>>>,
    cancel: CancellationToken,
    reader: Option<JoinHandle<()>>,
}

impl SerialProvider {
    /// Start the reader thread. It stops when `cancel` fires, the source is
    /// exhausted, or the provider is dropped.
    pub fn spawn<S>(name: impl Into<String>, framer: PacketFramer<S>, cancel: CancellationToken) -> Self
    where
        S: ByteSource + 'static,
    {
        let name = name.into();
        let (tx, rx) = mpsc::channel(FRAME_QUEUE_DEPTH);
        let thread_cancel = cancel.clone();
        let thread_name = name.clone();

        let reader = tokio::task::spawn_blocking(move || {
            Self::reader_loop(&thread_name, framer, tx, thread_cancel);
        });

        Self { name, events: rx, cancel, reader: Some(reader) }
    }

    fn reader_loop<S: ByteSource>(
        name: &str,
        mut framer: PacketFramer<S>,
        tx: mpsc::Sender<Result<Vec<FrameEvent>>>,
        cancel: CancellationToken,
    ) {
        info!(source = name, "Framer thread started");

        while !cancel.is_cancelled() {
            let batch = framer.poll();
            let had_events = batch.as_ref().map(|events| !events.is_empty()).unwrap_or(true);

            if had_events && tx.blocking_send(batch).is_err() {
                debug!(source = name, "Event receiver dropped");
                break;
            }
            if framer.is_source_exhausted() {
                info!(source = name, "Source exhausted");
                break;
            }
        }

        let dropped = framer.discard_partial();
        if dropped > 0 {
            warn!(source = name, "Discarded {} bytes of partial payload at shutdown", dropped);
        }
        let stats = framer.stats();
        info!(
            source = name,
            packets = stats.packets,
            unknown = stats.unknown,
            short_reads = stats.short_reads,
            "Framer thread stopped"
        );
    }

    /// Stop the reader thread and wait for it to release the source.
    pub async fn shutdown(mut self) -> Result<()> {
        self.cancel.cancel();
        self.events.close();
        if let Some(reader) = self.reader.take() {
            reader.await.map_err(|e| {
                RadiometerError::io("joining framer thread", std::io::Error::other(e.to_string()))
            })?;
        }
        Ok(())
    }
}

impl Drop for SerialProvider {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[async_trait::async_trait]
impl Provider for SerialProvider {
    async fn next_events(&mut self) -> Result<Option<Vec<FrameEvent>>> {
        match self.events.recv().await {
            Some(batch) => batch.map(Some),
            None => Ok(None),
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
