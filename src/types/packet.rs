//! Framed packet types

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Classification of a framed unit, decided solely by its sync token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketKind {
    /// Sample ensemble (two counters plus the raw samples)
    Data,
    /// Once-per-second instrument heartbeat
    Heartbeat,
    /// Token window matched nothing; zero-length diagnostic unit
    Unknown,
}

impl PacketKind {
    /// Device-role channel suffix for the raw bytes of this kind.
    pub fn raw_suffix(self) -> &'static str {
        match self {
            PacketKind::Data => "o",
            PacketKind::Heartbeat => "h",
            PacketKind::Unknown => "r",
        }
    }
}

/// The last N bytes observed on the wire.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SyncToken(Box<[u8]>);

impl SyncToken {
    /// Build a token from raw bytes.
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Parse a token from a hex string such as `"FDFDFDFD"` or `"00 ff 00 ff"`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits: Vec<u8> =
            hex.bytes().filter(|b| !b.is_ascii_whitespace()).collect::<Vec<u8>>();
        if digits.is_empty() || digits.len() % 2 != 0 {
            return None;
        }

        let mut bytes = Vec::with_capacity(digits.len() / 2);
        for pair in digits.chunks(2) {
            let text = std::str::from_utf8(pair).ok()?;
            bytes.push(u8::from_str_radix(text, 16).ok()?);
        }
        Some(Self::new(bytes))
    }

    /// Token bytes in wire order.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Token length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for a zero-length token.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SyncToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for SyncToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyncToken({})", self)
    }
}

/// One framed unit emitted by the framer.
///
/// Immutable once constructed. Unknown packets carry an empty payload and are
/// only ever logged or republished for diagnostics.
#[derive(Debug, Clone)]
pub struct Packet {
    /// Receive time in microseconds (monotonic, anchored to the Unix epoch)
    pub utime: i64,

    /// Classification from the sync table
    pub kind: PacketKind,

    /// Token window at the time of framing
    pub token: SyncToken,

    /// Opaque payload bytes (zero-copy via Arc)
    pub payload: Arc<[u8]>,
}

impl Packet {
    /// Create a new packet
    pub fn new(utime: i64, kind: PacketKind, token: SyncToken, payload: Vec<u8>) -> Self {
        Self { utime, kind, token, payload: payload.into() }
    }

    /// Token followed by payload, as it appeared on the wire.
    pub fn wire_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.token.len() + self.payload.len());
        bytes.extend_from_slice(self.token.as_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }
}
