//! Core types for radiometer telemetry.
//!
//! Data flows through these types in one direction:
//! - [`Packet`] is produced by the framer, one per framed unit (Unknown units included)
//! - [`DataRecord`] / [`HeartbeatRecord`] are produced by the decoder
//! - [`SampleBatch`] is a scaled ensemble consumed by estimators
//! - [`EstimateResult`] is a scalar estimate ready for publishing
//!
//! [`WindowBuffer`] is the fixed-capacity FIFO every estimator is built on, and
//! [`UtimeClock`] stamps packets as they are framed.
//!
//! ## Usage Example
//!
//! ```rust
//! use radiometer::types::{SampleBatch, SampleUnit, WindowBuffer};
//!
//! let batch = SampleBatch::new(1_000, vec![3.0, 1.0, 2.0], SampleUnit::RawCount);
//! let mut window = WindowBuffer::new(4).unwrap();
//! window.extend(batch.values.iter().copied());
//! assert!(!window.is_full());
//! window.push(0.5);
//! assert_eq!(window.min(), Some(0.5));
//! ```

mod clock;
mod estimate;
mod heartbeat;
mod packet;
mod sample;
mod window;

pub use clock::UtimeClock;
pub use estimate::EstimateResult;
pub use heartbeat::HeartbeatRecord;
pub use packet::{Packet, PacketKind, SyncToken};
pub use sample::{DataRecord, SampleBatch, SampleUnit};
pub use window::WindowBuffer;
