//! Sync token lookup

use serde::{Deserialize, Serialize};

use crate::decode::{DATA_PAYLOAD_SIZE, HeartbeatLayout};
use crate::types::PacketKind;
use crate::{RadiometerError, Result};

/// One known sync pattern and what follows it on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPattern {
    pub token: Vec<u8>,
    pub kind: PacketKind,
    pub payload_len: usize,
}

/// Result of matching a token window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMatch {
    pub kind: PacketKind,
    pub payload_len: usize,
}

impl TokenMatch {
    /// The no-match result: Unknown with a zero-length payload.
    pub const UNKNOWN: TokenMatch = TokenMatch { kind: PacketKind::Unknown, payload_len: 0 };
}

/// Firmware presets for the sync table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPreset {
    /// `FDFDFDFD` data, `FEFEFEFE` seven-word heartbeat
    #[default]
    Mesobot,
    /// `00FF00FF` data, `00FE00FE` five-word heartbeat
    Legacy,
}

impl SyncPreset {
    /// Heartbeat layout sent by this firmware.
    pub fn heartbeat_layout(self) -> HeartbeatLayout {
        match self {
            SyncPreset::Mesobot => HeartbeatLayout::Extended,
            SyncPreset::Legacy => HeartbeatLayout::Compact,
        }
    }

    /// Build the sync table for this firmware.
    pub fn table(self) -> SyncTable {
        let (data, heartbeat) = match self {
            SyncPreset::Mesobot => ([0xFD, 0xFD, 0xFD, 0xFD], [0xFE, 0xFE, 0xFE, 0xFE]),
            SyncPreset::Legacy => ([0x00, 0xFF, 0x00, 0xFF], [0x00, 0xFE, 0x00, 0xFE]),
        };

        SyncTable {
            token_len: 4,
            patterns: vec![
                SyncPattern {
                    token: data.to_vec(),
                    kind: PacketKind::Data,
                    payload_len: DATA_PAYLOAD_SIZE,
                },
                SyncPattern {
                    token: heartbeat.to_vec(),
                    kind: PacketKind::Heartbeat,
                    payload_len: self.heartbeat_layout().size(),
                },
            ],
        }
    }
}

/// Static table of sync patterns sharing one token length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTable {
    token_len: usize,
    patterns: Vec<SyncPattern>,
}

impl SyncTable {
    /// Build a custom table. All tokens must share a non-zero length and be distinct.
    pub fn new(patterns: Vec<SyncPattern>) -> Result<Self> {
        let token_len = patterns
            .first()
            .map(|p| p.token.len())
            .ok_or_else(|| RadiometerError::config("sync table needs at least one pattern"))?;

        if token_len == 0 {
            return Err(RadiometerError::config("sync tokens must not be empty"));
        }

        for (i, pattern) in patterns.iter().enumerate() {
            if pattern.token.len() != token_len {
                return Err(RadiometerError::config(format!(
                    "sync token {} has length {}, expected {}",
                    i,
                    pattern.token.len(),
                    token_len
                )));
            }
            if pattern.kind == PacketKind::Unknown {
                return Err(RadiometerError::config("Unknown is reserved for unmatched windows"));
            }
            if patterns[..i].iter().any(|other| other.token == pattern.token) {
                return Err(RadiometerError::config(format!("duplicate sync token {}", i)));
            }
        }

        Ok(Self { token_len, patterns })
    }

    /// Length N of every token in the table.
    pub fn token_len(&self) -> usize {
        self.token_len
    }

    pub fn patterns(&self) -> &[SyncPattern] {
        &self.patterns
    }
}

/// Exact-equality matcher over a [`SyncTable`].
///
/// Deterministic and side-effect free: the same window always yields the same
/// match, and windows of the wrong length never match.
#[derive(Debug, Clone)]
pub struct SyncTokenMatcher {
    table: SyncTable,
}

impl SyncTokenMatcher {
    pub fn new(table: SyncTable) -> Self {
        Self { table }
    }

    pub fn token_len(&self) -> usize {
        self.table.token_len
    }

    pub fn table(&self) -> &SyncTable {
        &self.table
    }

    /// Classify a token window.
    pub fn classify(&self, window: &[u8]) -> TokenMatch {
        self.table
            .patterns
            .iter()
            .find(|p| p.token == window)
            .map(|p| TokenMatch { kind: p.kind, payload_len: p.payload_len })
            .unwrap_or(TokenMatch::UNKNOWN)
    }
}
