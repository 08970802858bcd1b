//! Replay provider for serial capture files

use std::path::Path;

use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::framing::{FrameEvent, PacketFramer, SyncTable};
use crate::provider::Provider;
use crate::source::CaptureSource;
use crate::Result;

/// Default time between polls of the capture.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Replay provider that frames a recorded capture
pub struct ReplayProvider {
    /// Framer over the capture bytes
    framer: PacketFramer<CaptureSource>,

    /// Nominal time between polls at 1x speed
    poll_interval: Duration,

    /// Playback speed multiplier (1.0 = normal, 2.0 = double speed)
    speed: f64,

    /// Poll pacing; `None` replays as fast as possible
    pacing: Option<Interval>,

    name: String,
}

impl ReplayProvider {
    /// Open a capture file and frame it with `table`
    pub fn open<P: AsRef<Path>>(path: P, table: SyncTable) -> Result<Self> {
        let source = CaptureSource::open(path)?;
        Ok(Self::new(source, table))
    }

    /// Replay an already loaded capture
    pub fn new(source: CaptureSource, table: SyncTable) -> Self {
        let name = source.path().display().to_string();
        info!("Opened capture {}: {} bytes", name, source.len());

        let mut provider = Self {
            framer: PacketFramer::new(source, table).with_read_timeout(Duration::ZERO),
            poll_interval: DEFAULT_POLL_INTERVAL,
            speed: 1.0,
            pacing: None,
            name,
        };
        provider.reset_pacing();
        provider
    }

    /// Set the nominal poll interval. Zero disables pacing.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.reset_pacing();
        self
    }

    /// Set playback speed
    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed.clamp(0.1, 100.0);
        self.reset_pacing();
        debug!("Playback speed set to {}x", self.speed);
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Fraction of the capture consumed, 0.0 to 1.0
    pub fn progress(&self) -> f64 {
        let source = self.framer.source();
        if source.is_empty() { 1.0 } else { source.position() as f64 / source.len() as f64 }
    }

    fn reset_pacing(&mut self) {
        self.pacing = if self.poll_interval.is_zero() {
            None
        } else {
            let mut pacing = interval(self.poll_interval.div_f64(self.speed));
            pacing.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Some(pacing)
        };
    }
}

#[async_trait::async_trait]
impl Provider for ReplayProvider {
    async fn next_events(&mut self) -> Result<Option<Vec<FrameEvent>>> {
        loop {
            if self.framer.is_source_exhausted() {
                debug!("Reached end of capture");
                return Ok(None);
            }

            if let Some(pacing) = self.pacing.as_mut() {
                pacing.tick().await;
            }

            let events = self.framer.poll()?;
            trace!("Replay poll: {} events, {:.1}% consumed", events.len(), self.progress() * 100.0);
            if !events.is_empty() {
                return Ok(Some(events));
            }
        }
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::SyncPreset;
    use crate::test_utils::{data_frame, heartbeat_frame};
    use crate::types::PacketKind;
    use std::io::Write;

    #[tokio::test]
    async fn replays_capture_file_to_end() {
        let mut capture = data_frame(1, 1, &[10; 50]);
        capture.extend(heartbeat_frame(&[1, 2, 3, 4, 5, 6, 7]));
        capture.extend([0xAB, 0xCD]);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&capture).unwrap();

        let mut provider = ReplayProvider::open(file.path(), SyncPreset::Mesobot.table())
            .unwrap()
            .with_poll_interval(Duration::ZERO);

        let mut kinds = Vec::new();
        while let Some(events) = provider.next_events().await.unwrap() {
            kinds.extend(events.iter().filter_map(FrameEvent::packet).map(|p| p.kind));
        }

        assert_eq!(&kinds[..2], &[PacketKind::Data, PacketKind::Heartbeat]);
        assert!(kinds[2..].iter().all(|k| *k == PacketKind::Unknown));
        assert_eq!(provider.progress(), 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn paced_replay_respects_speed() {
        let source = CaptureSource::from_bytes(data_frame(0, 0, &[1; 50]));
        let mut provider = ReplayProvider::new(source, SyncPreset::Mesobot.table());
        provider.set_speed(1000.0);
        assert_eq!(provider.speed(), 100.0);

        let events = provider.next_events().await.unwrap().unwrap();
        assert_eq!(events.len(), 1);
        assert!(provider.next_events().await.unwrap().is_none());
    }
}
