//! Packet framing over a raw byte stream.
//!
//! [`SyncTokenMatcher`] classifies a fixed-length token window against a static
//! [`SyncTable`]; [`PacketFramer`] drives it over a [`ByteSource`](crate::source::ByteSource)
//! and emits [`FrameEvent`]s in wire order.
//!
//! ```rust
//! use radiometer::framing::{FrameEvent, PacketFramer, SyncPreset};
//! use radiometer::source::MemorySource;
//! use radiometer::types::PacketKind;
//!
//! let mut bytes = vec![0x12];
//! bytes.extend([0xFE; 4]);
//! bytes.extend([0u8; 28]);
//!
//! let mut framer = PacketFramer::new(MemorySource::new(bytes), SyncPreset::Mesobot.table());
//! let kinds: Vec<PacketKind> = framer
//!     .poll()
//!     .unwrap()
//!     .iter()
//!     .filter_map(FrameEvent::packet)
//!     .map(|p| p.kind)
//!     .collect();
//! assert_eq!(kinds, vec![PacketKind::Unknown, PacketKind::Heartbeat]);
//! ```

mod framer;
mod token;

pub use framer::{DEFAULT_READ_TIMEOUT, FrameEvent, FramerState, FramerStats, PacketFramer};
pub use token::{SyncPattern, SyncPreset, SyncTable, SyncTokenMatcher, TokenMatch};
