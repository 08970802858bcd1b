//! Monotonic microsecond timestamps

use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Produces monotonic microsecond timestamps anchored to the Unix epoch.
///
/// The wall clock is read once at construction; later stamps add the elapsed
/// monotonic time so they never run backwards when the system clock steps.
#[derive(Debug, Clone, Copy)]
pub struct UtimeClock {
    anchor_utime: i64,
    anchor: Instant,
}

impl UtimeClock {
    pub fn new() -> Self {
        let anchor_utime = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or_default();
        Self { anchor_utime, anchor: Instant::now() }
    }

    /// Current timestamp in microseconds.
    pub fn now(&self) -> i64 {
        self.anchor_utime + self.anchor.elapsed().as_micros() as i64
    }
}

impl Default for UtimeClock {
    fn default() -> Self {
        Self::new()
    }
}
