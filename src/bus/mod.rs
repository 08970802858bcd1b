//! Publish/subscribe by channel name.
//!
//! The bus carries opaque byte payloads; [`message`] defines the payload types
//! the pipeline stages exchange. [`LocalBus`] is the in-process implementation
//! used when every stage runs in one runtime and in tests.
//!
//! Each [`Subscription`] owns a single queue fed by every channel it listens on,
//! so delivery order across those channels matches publish order. Dropping the
//! subscription unsubscribes it.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::trace;

use crate::{RadiometerError, Result};

pub mod message;

pub use message::{BusPayload, FloatsMessage, RadiometerMessage, RawBytesMessage};

/// One delivered payload and the channel it arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub channel: String,
    pub payload: Arc<[u8]>,
}

/// Channel-addressed message bus.
pub trait MessageBus: Send + Sync + 'static {
    /// Publish opaque bytes on `channel`. Publishing with no subscribers succeeds.
    fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<()>;

    /// Subscribe to every channel in `channels` through one ordered queue.
    fn subscribe(&self, channels: &[String]) -> Result<Subscription>;
}

pin_project! {
    /// Stream of envelopes for a set of channels.
    pub struct Subscription {
        channels: Vec<String>,
        #[pin]
        inner: UnboundedReceiverStream<Envelope>,
    }
}

impl Subscription {
    /// Wrap the receiving end of a subscription queue.
    pub fn new(channels: Vec<String>, receiver: mpsc::UnboundedReceiver<Envelope>) -> Self {
        Self { channels, inner: UnboundedReceiverStream::new(receiver) }
    }

    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Next envelope, `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<Envelope> {
        self.next().await
    }
}

impl Stream for Subscription {
    type Item = Envelope;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("channels", &self.channels).finish()
    }
}

type Routes = HashMap<String, Vec<mpsc::UnboundedSender<Envelope>>>;

/// In-process bus. Cloning shares the routing table.
#[derive(Clone, Default)]
pub struct LocalBus {
    routes: Arc<Mutex<Routes>>,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live subscriber count for a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.routes
            .lock()
            .map(|routes| {
                routes.get(channel).map(|s| s.iter().filter(|tx| !tx.is_closed()).count())
            })
            .ok()
            .flatten()
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for LocalBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBus").finish_non_exhaustive()
    }
}

impl MessageBus for LocalBus {
    fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<()> {
        let mut routes =
            self.routes.lock().map_err(|_| RadiometerError::bus(channel, "routing table poisoned"))?;

        let Some(senders) = routes.get_mut(channel) else {
            trace!(channel, "No subscribers");
            return Ok(());
        };

        let envelope = Envelope { channel: channel.to_string(), payload: payload.into() };
        senders.retain(|tx| tx.send(envelope.clone()).is_ok());
        trace!(channel, subscribers = senders.len(), "Published {} bytes", envelope.payload.len());

        if senders.is_empty() {
            routes.remove(channel);
        }
        Ok(())
    }

    fn subscribe(&self, channels: &[String]) -> Result<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut routes = self.routes.lock().map_err(|_| {
            RadiometerError::bus(channels.join(","), "routing table poisoned")
        })?;
        for channel in channels {
            routes.entry(channel.clone()).or_default().push(tx.clone());
        }
        Ok(Subscription::new(channels.to_vec(), rx))
    }
}
