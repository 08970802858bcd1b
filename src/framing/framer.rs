//! Byte-stream framer with byte-at-a-time resynchronisation
//!
//! The framer keeps a rolling window of the last N bytes seen on the wire and
//! runs a two-state machine over it:
//!
//! - **Seeking**: shift fresh bytes into the window until it can be evaluated,
//!   then classify it. A match moves to ReadingPayload. A miss emits an Unknown
//!   packet and shifts the window by exactly one byte.
//! - **ReadingPayload**: read the fixed payload length of the matched kind. A
//!   complete payload emits a packet and returns to Seeking with the window
//!   intact; the next N bytes shifted in form the next token. A short read keeps
//!   the partial payload and reports a shortfall; the next poll continues it.
//!
//! Payload bytes are never interpreted here.

use std::collections::VecDeque;
use std::time::Duration;

use tracing::{debug, trace};

use super::token::{SyncTable, SyncTokenMatcher};
use crate::source::ByteSource;
use crate::types::{Packet, PacketKind, SyncToken, UtimeClock};
use crate::{RadiometerError, Result};

/// Upper bound on packets emitted by a single poll so a saturated link cannot
/// starve the rest of the event loop.
const MAX_PACKETS_PER_POLL: usize = 64;

/// Default serial read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Something observed during one poll.
#[derive(Debug, Clone)]
pub enum FrameEvent {
    /// A framed unit, including zero-length Unknown units
    Packet(Packet),
    /// The source returned fewer payload bytes than expected; retried next poll
    ShortRead { kind: PacketKind, expected: usize, received: usize },
}

impl FrameEvent {
    /// The packet, if this event carries one.
    pub fn packet(&self) -> Option<&Packet> {
        match self {
            FrameEvent::Packet(packet) => Some(packet),
            FrameEvent::ShortRead { .. } => None,
        }
    }

    /// Shortfall as an error value, for logging and classification.
    pub fn as_error(&self) -> Option<RadiometerError> {
        match self {
            FrameEvent::Packet(_) => None,
            FrameEvent::ShortRead { expected, received, .. } => {
                Some(RadiometerError::short_read(*expected, *received))
            }
        }
    }
}

/// Framer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramerState {
    /// No payload length known
    Seeking,
    /// Payload length known, `received` bytes read so far
    ReadingPayload { kind: PacketKind, expected: usize, received: Vec<u8> },
}

/// Running counters for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    pub bytes_read: u64,
    pub packets: u64,
    pub unknown: u64,
    pub short_reads: u64,
}

/// Recovers packet boundaries from a byte source.
///
/// The framer exclusively owns its token window and partial-read state.
pub struct PacketFramer<S> {
    source: S,
    matcher: SyncTokenMatcher,
    window: VecDeque<u8>,
    /// Bytes still to shift in before the window may be evaluated
    pending: usize,
    state: FramerState,
    clock: UtimeClock,
    read_timeout: Duration,
    stats: FramerStats,
}

impl<S: ByteSource> PacketFramer<S> {
    /// Create a framer in the Seeking state with an empty token window.
    pub fn new(source: S, table: SyncTable) -> Self {
        let matcher = SyncTokenMatcher::new(table);
        let token_len = matcher.token_len();
        Self {
            source,
            matcher,
            window: VecDeque::with_capacity(token_len),
            pending: token_len,
            state: FramerState::Seeking,
            clock: UtimeClock::new(),
            read_timeout: DEFAULT_READ_TIMEOUT,
            stats: FramerStats::default(),
        }
    }

    /// Set the per-read timeout passed to the source.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn state(&self) -> &FramerState {
        &self.state
    }

    pub fn stats(&self) -> FramerStats {
        self.stats
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// True once the source can produce no more bytes.
    pub fn is_source_exhausted(&self) -> bool {
        self.source.is_exhausted()
    }

    /// Drop any partially read payload and return to Seeking.
    ///
    /// Returns the number of discarded payload bytes.
    pub fn discard_partial(&mut self) -> usize {
        let dropped = match &self.state {
            FramerState::ReadingPayload { received, .. } => received.len(),
            FramerState::Seeking => 0,
        };
        if dropped > 0 {
            debug!("Discarding {} bytes of partial payload", dropped);
        }
        self.state = FramerState::Seeking;
        self.pending = self.matcher.token_len();
        dropped
    }

    /// Read what the source has and frame as many units as possible.
    ///
    /// Returns the events in wire order. An empty result means the source had
    /// nothing (or not enough) to frame yet.
    pub fn poll(&mut self) -> Result<Vec<FrameEvent>> {
        let mut events = Vec::new();
        let mut framed = 0usize;

        while framed < MAX_PACKETS_PER_POLL {
            match &mut self.state {
                FramerState::Seeking => {
                    if self.pending > 0 && !self.fill_window()? {
                        break;
                    }

                    let matched = self.matcher.classify(self.window.make_contiguous());
                    if matched.kind == PacketKind::Unknown {
                        let packet = self.unknown_packet();
                        trace!("No sync match for {}; shifting one byte", packet.token);
                        events.push(FrameEvent::Packet(packet));
                        self.stats.unknown += 1;
                        framed += 1;
                        self.pending = 1;
                        if !self.has_waiting_bytes()? {
                            break;
                        }
                        continue;
                    }

                    trace!(
                        "Sync {:?} on {:02x?}; expecting {} payload bytes",
                        matched.kind, self.window, matched.payload_len
                    );
                    self.state = FramerState::ReadingPayload {
                        kind: matched.kind,
                        expected: matched.payload_len,
                        received: Vec::with_capacity(matched.payload_len),
                    };
                }
                FramerState::ReadingPayload { kind, expected, received } => {
                    let missing = *expected - received.len();
                    if missing > 0 {
                        let chunk = self.source.read(missing, self.read_timeout).map_err(|e| {
                            RadiometerError::io("serial payload read", e)
                        })?;
                        self.stats.bytes_read += chunk.len() as u64;
                        received.extend_from_slice(&chunk);
                    }

                    if received.len() < *expected {
                        debug!(
                            "Short read: tried to read {} but only have {}",
                            expected,
                            received.len()
                        );
                        events.push(FrameEvent::ShortRead {
                            kind: *kind,
                            expected: *expected,
                            received: received.len(),
                        });
                        self.stats.short_reads += 1;
                        break;
                    }

                    let kind = *kind;
                    let payload = std::mem::take(received);
                    let token = SyncToken::new(self.window.iter().copied().collect::<Vec<u8>>());
                    let packet = Packet::new(self.clock.now(), kind, token, payload);
                    trace!("Framed {:?} packet ({} bytes)", kind, packet.payload.len());

                    events.push(FrameEvent::Packet(packet));
                    self.stats.packets += 1;
                    framed += 1;
                    self.state = FramerState::Seeking;
                    self.pending = self.matcher.token_len();

                    if !self.has_waiting_bytes()? {
                        break;
                    }
                }
            }
        }

        Ok(events)
    }

    /// Shift pending bytes into the window. Returns true once it can be evaluated.
    fn fill_window(&mut self) -> Result<bool> {
        let chunk = self
            .source
            .read(self.pending, self.read_timeout)
            .map_err(|e| RadiometerError::io("serial token read", e))?;
        self.stats.bytes_read += chunk.len() as u64;

        let token_len = self.matcher.token_len();
        for byte in chunk.iter().take(self.pending) {
            if self.window.len() == token_len {
                self.window.pop_front();
            }
            self.window.push_back(*byte);
        }
        self.pending -= chunk.len().min(self.pending);

        Ok(self.pending == 0)
    }

    fn has_waiting_bytes(&mut self) -> Result<bool> {
        let waiting =
            self.source.bytes_waiting().map_err(|e| RadiometerError::io("serial in_waiting", e))?;
        Ok(waiting > 0)
    }

    fn unknown_packet(&self) -> Packet {
        let token = SyncToken::new(self.window.iter().copied().collect::<Vec<u8>>());
        Packet::new(self.clock.now(), PacketKind::Unknown, token, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::SyncPreset;
    use crate::source::MemorySource;
    use crate::test_utils::{data_frame, data_payload, heartbeat_frame, heartbeat_payload};
    use proptest::prelude::*;

    fn framer(bytes: Vec<u8>) -> PacketFramer<MemorySource> {
        PacketFramer::new(MemorySource::new(bytes), SyncPreset::Mesobot.table())
    }

    fn drain(framer: &mut PacketFramer<MemorySource>) -> Vec<FrameEvent> {
        let mut events = Vec::new();
        loop {
            let batch = framer.poll().expect("memory source never fails");
            if batch.is_empty() {
                break;
            }
            events.extend(batch);
        }
        events
    }

    fn packets(events: &[FrameEvent]) -> Vec<&Packet> {
        events.iter().filter_map(FrameEvent::packet).collect()
    }

    #[test]
    fn frames_single_data_packet() {
        let samples: Vec<u16> = (0..50).collect();
        let mut framer = framer(data_frame(1, 2, &samples));

        let events = drain(&mut framer);
        let packets = packets(&events);
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].kind, PacketKind::Data);
        assert_eq!(packets[0].token.as_bytes(), &[0xFD; 4]);
        assert_eq!(&*packets[0].payload, data_payload(1, 2, &samples).as_slice());
        assert_eq!(framer.stats().packets, 1);
        assert_eq!(framer.stats().unknown, 0);
    }

    #[test]
    fn back_to_back_packets_need_no_resync() {
        let mut bytes = data_frame(1, 1, &[5; 50]);
        bytes.extend(heartbeat_frame(&[1, 2, 3, 4, 5, 6, 7]));
        bytes.extend(data_frame(2, 2, &[6; 50]));

        let mut framer = framer(bytes);
        let events = drain(&mut framer);
        let kinds: Vec<PacketKind> = packets(&events).iter().map(|p| p.kind).collect();
        assert_eq!(kinds, vec![PacketKind::Data, PacketKind::Heartbeat, PacketKind::Data]);
        assert_eq!(framer.stats().unknown, 0);
    }

    #[test]
    fn garbage_before_token_yields_one_unknown_per_byte() {
        let mut bytes = vec![0x01, 0x02, 0x03];
        bytes.extend(heartbeat_frame(&[9; 7]));

        let mut framer = framer(bytes);
        let events = drain(&mut framer);
        let packets = packets(&events);

        assert_eq!(packets.len(), 4);
        assert!(packets[..3].iter().all(|p| p.kind == PacketKind::Unknown));
        assert!(packets[..3].iter().all(|p| p.payload.is_empty()));
        assert_eq!(packets[0].token.as_bytes(), &[0x01, 0x02, 0x03, 0xFE]);
        assert_eq!(packets[3].kind, PacketKind::Heartbeat);
        assert_eq!(&*packets[3].payload, heartbeat_payload(&[9; 7]).as_slice());
    }

    #[test]
    fn short_read_resumes_on_next_poll() {
        let frame = data_frame(3, 4, &[7; 50]);
        let (head, tail) = frame.split_at(40);

        let mut framer = framer(head.to_vec());
        let events = framer.poll().unwrap();
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            FrameEvent::ShortRead { kind: PacketKind::Data, expected: 108, received: 36 }
        ));
        assert!(events[0].as_error().unwrap().is_retryable());
        assert!(matches!(framer.state(), FramerState::ReadingPayload { .. }));

        framer.source_mut().push(tail);
        let events = framer.poll().unwrap();
        let packets = packets(&events);
        assert_eq!(packets.len(), 1);
        assert_eq!(&*packets[0].payload, data_payload(3, 4, &[7; 50]).as_slice());
        assert_eq!(framer.stats().short_reads, 1);
    }

    #[test]
    fn partial_token_waits_for_more_bytes() {
        let mut framer = framer(vec![0xFD, 0xFD]);
        assert!(framer.poll().unwrap().is_empty());
        assert_eq!(framer.state(), &FramerState::Seeking);

        let frame = data_frame(0, 0, &[1; 50]);
        framer.source_mut().push(&frame[2..]);
        let events = drain(&mut framer);
        assert_eq!(packets(&events).len(), 1);
    }

    #[test]
    fn discard_partial_returns_to_seeking() {
        let frame = data_frame(0, 0, &[1; 50]);
        let mut framer = framer(frame[..20].to_vec());
        framer.poll().unwrap();

        assert_eq!(framer.discard_partial(), 16);
        assert_eq!(framer.state(), &FramerState::Seeking);
        assert_eq!(framer.discard_partial(), 0);
    }

    proptest! {
        #[test]
        fn recovers_lock_after_arbitrary_garbage(
            garbage in prop::collection::vec(0x00u8..0xF0, 0..64),
            samples in prop::collection::vec(any::<u16>(), 50),
        ) {
            let mut bytes = garbage.clone();
            bytes.extend(data_frame(11, 22, &samples));

            let mut framer = framer(bytes);
            let events = drain(&mut framer);
            let packets = packets(&events);

            let unknown = packets.iter().filter(|p| p.kind == PacketKind::Unknown).count();
            prop_assert_eq!(unknown, garbage.len());

            let data: Vec<_> = packets.iter().filter(|p| p.kind == PacketKind::Data).collect();
            prop_assert_eq!(data.len(), 1);
            let expected = data_payload(11, 22, &samples);
            prop_assert_eq!(&data[0].payload[..], &expected[..]);
        }
    }
}
