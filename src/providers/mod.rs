//! Provider implementations.

mod replay;
mod serial;

pub use replay::ReplayProvider;
pub use serial::{FRAME_QUEUE_DEPTH, SerialProvider};
