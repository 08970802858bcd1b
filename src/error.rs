//! Error types for radiometer acquisition and filtering.
//!
//! Every condition raised by the framing and estimation core is locally
//! recoverable. The only process-fatal failures are opening the serial device
//! or the message bus at startup, and those are reported through the same type
//! so the daemon can print guidance before exiting.
//!
//! ## Error Categories
//!
//! - **Framing**: the token window matched no known sync pattern (resync follows)
//! - **Short reads**: the serial source returned fewer payload bytes than expected
//! - **Decode**: a payload length does not match the fixed layout of its kind
//! - **Window not full**: an estimator has no result yet
//! - **Serial / I/O**: device open, read and write failures
//! - **Bus / Codec**: channel subscription problems and malformed bus payloads
//! - **Config**: invalid daemon or estimator configuration
//!
//! ## Recovery
//!
//! ```rust
//! use radiometer::RadiometerError;
//!
//! let error = RadiometerError::short_read(108, 40);
//! assert!(error.is_retryable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::time::Duration;
use thiserror::Error;

use crate::types::PacketKind;

/// Result type alias for radiometer operations.
pub type Result<T, E = RadiometerError> = std::result::Result<T, E>;

/// Main error type for radiometer operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum RadiometerError {
    #[error("Token window {token} matches no sync pattern")]
    Framing { token: String },

    #[error("Short read: expected {expected} payload bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    #[error("Cannot decode {kind:?} payload: expected {expected} bytes, got {actual}")]
    Decode { kind: PacketKind, expected: usize, actual: usize },

    #[error("Window not full: {len} < {capacity}")]
    WindowNotFull { len: usize, capacity: usize },

    #[error("Serial device error: {device}")]
    Serial {
        device: String,
        #[source]
        source: serialport::Error,
    },

    #[error("I/O error during {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Bus error on channel '{channel}': {reason}")]
    Bus { channel: String, reason: String },

    #[error("Codec error in {context}: {details}")]
    Codec { context: String, details: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },
}

impl RadiometerError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            RadiometerError::Framing { .. } => true,
            RadiometerError::ShortRead { .. } => true,
            RadiometerError::WindowNotFull { .. } => true,
            RadiometerError::Timeout { .. } => true,
            RadiometerError::Io { .. } => true,
            RadiometerError::Bus { .. } => true,
            RadiometerError::Decode { .. } => false,
            RadiometerError::Serial { .. } => false,
            RadiometerError::Codec { .. } => false,
            RadiometerError::Config { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            RadiometerError::Framing { .. } => vec![
                "Resynchronisation advances one byte at a time; no action needed",
                "Check the sync preset matches the instrument firmware",
            ],
            RadiometerError::ShortRead { .. } => vec![
                "The remaining payload is read on the next poll",
                "Increase the serial read timeout if shortfalls are frequent",
                "Check the baud rate matches the instrument",
            ],
            RadiometerError::Decode { .. } => vec![
                "Verify the heartbeat layout (extended vs compact) for this firmware",
                "Check the sync preset payload lengths",
            ],
            RadiometerError::WindowNotFull { .. } => {
                vec!["Wait for more ensembles; the estimator emits once its window is full"]
            }
            RadiometerError::Serial { .. } => vec![
                "Check the device path exists and is readable",
                "Ensure no other process has the port open",
                "Check user permissions for the serial device (dialout group)",
            ],
            RadiometerError::Io { .. } => vec![
                "Check the device or capture file is still present",
                "Retry the operation",
            ],
            RadiometerError::Bus { .. } => vec![
                "Check the channel name and that a publisher is running",
                "Restart the subscribing stage",
            ],
            RadiometerError::Codec { .. } => vec![
                "Check the publisher sends the expected message type on this channel",
                "Verify publisher and subscriber run compatible versions",
            ],
            RadiometerError::Config { .. } => vec![
                "Check the configuration file against the documented defaults",
                "Window widths, taps and packet counts must be positive",
            ],
            RadiometerError::Timeout { .. } => {
                vec!["Increase the timeout duration", "Verify the instrument is powered"]
            }
        }
    }

    /// Helper constructor for payload shortfalls.
    pub fn short_read(expected: usize, received: usize) -> Self {
        RadiometerError::ShortRead { expected, received }
    }

    /// Helper constructor for payload length mismatches.
    pub fn decode_mismatch(kind: PacketKind, expected: usize, actual: usize) -> Self {
        RadiometerError::Decode { kind, expected, actual }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        RadiometerError::Config { reason: reason.into() }
    }

    /// Helper constructor for bus errors.
    pub fn bus(channel: impl Into<String>, reason: impl Into<String>) -> Self {
        RadiometerError::Bus { channel: channel.into(), reason: reason.into() }
    }

    /// Helper constructor for codec errors.
    pub fn codec(context: impl Into<String>, details: impl Into<String>) -> Self {
        RadiometerError::Codec { context: context.into(), details: details.into() }
    }

    /// Helper constructor for I/O errors with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        RadiometerError::Io { context: context.into(), source }
    }

    /// Helper constructor for serial open failures.
    pub fn serial_open(device: impl Into<String>, source: serialport::Error) -> Self {
        RadiometerError::Serial { device: device.into(), source }
    }
}

impl From<std::io::Error> for RadiometerError {
    fn from(err: std::io::Error) -> Self {
        RadiometerError::Io { context: "<unknown>".to_string(), source: err }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_their_context(
            expected in 1usize..4096,
            received in 0usize..4096,
            channel in "[A-Z]{3}[0-9][a-z]{1,6}",
            reason in ".*",
        ) {
            let short = RadiometerError::short_read(expected, received);
            let msg = short.to_string();
            prop_assert!(msg.contains(&expected.to_string()));
            prop_assert!(msg.contains(&received.to_string()));

            let bus = RadiometerError::bus(channel.clone(), reason.clone());
            let msg = bus.to_string();
            prop_assert!(msg.contains(&channel));
            prop_assert!(msg.contains(&reason));
        }
    }

    #[test]
    fn core_conditions_are_retryable() {
        assert!(RadiometerError::Framing { token: "00 11 22 33".into() }.is_retryable());
        assert!(RadiometerError::short_read(108, 12).is_retryable());
        assert!(RadiometerError::WindowNotFull { len: 50, capacity: 100 }.is_retryable());
        assert!(!RadiometerError::decode_mismatch(PacketKind::Data, 108, 100).is_retryable());
        assert!(!RadiometerError::config("zero width").is_retryable());
    }

    #[test]
    fn every_variant_has_guidance() {
        let errors = vec![
            RadiometerError::Framing { token: "ff".into() },
            RadiometerError::short_read(1, 0),
            RadiometerError::decode_mismatch(PacketKind::Heartbeat, 28, 20),
            RadiometerError::WindowNotFull { len: 1, capacity: 2 },
            RadiometerError::io("read", std::io::Error::other("gone")),
            RadiometerError::bus("RAD1o", "closed"),
            RadiometerError::codec("floats", "truncated"),
            RadiometerError::config("bad"),
            RadiometerError::Timeout { duration: Duration::from_secs(1) },
        ];

        for error in errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty(), "no guidance for {error}");
            for suggestion in suggestions {
                assert!(suggestion.len() > 5);
            }
        }
    }

    #[test]
    fn io_errors_convert_with_source() {
        let err: RadiometerError = std::io::Error::other("device unplugged").into();
        match err {
            RadiometerError::Io { source, .. } => {
                assert_eq!(source.to_string(), "device unplugged");
            }
            other => panic!("Expected Io variant, got {other:?}"),
        }
    }

    #[test]
    fn error_is_send_sync_static() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<RadiometerError>();
    }
}
