//! Provider trait for framed packet sources

use crate::Result;
use crate::framing::FrameEvent;

/// Trait for framed packet sources
///
/// Providers abstract over live serial ports and recorded captures and handle
/// their own timing internally.
#[async_trait::async_trait]
pub trait Provider: Send + 'static {
    /// Get the events framed by the next poll of the source
    ///
    /// Returns:
    /// - `Ok(Some(events))` - One or more events, in wire order
    /// - `Ok(None)` - Source exhausted (normal termination)
    /// - `Err(e)` - Error occurred
    async fn next_events(&mut self) -> Result<Option<Vec<FrameEvent>>>;

    /// Human-readable source name for logs
    fn source_name(&self) -> &str;
}
