//! Bus channel naming
//!
//! The pipeline graph is keyed entirely by channel-name concatenation, so every
//! stage derives its output channel from its input channel and configuration
//! with the helpers here. Downstream subscribers rely on the literal names.

use std::fmt;

/// Default device prefix stem; the last character of the device path is appended.
pub const DEFAULT_PREFIX_STEM: &str = "RAD";

/// Suffixes owned by the serial bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceRole {
    /// Commands written to the instrument (`i`)
    Inbound,
    /// Raw data packets (`o`)
    Output,
    /// Raw heartbeat packets (`h`)
    Heartbeat,
    /// Time-high scaled samples (`t`)
    Transformed,
    /// Percent-of-full-scale samples (`p`)
    Percent,
    /// Unmatched token windows (`r`)
    Resync,
}

impl DeviceRole {
    pub const fn suffix(self) -> &'static str {
        match self {
            DeviceRole::Inbound => "i",
            DeviceRole::Output => "o",
            DeviceRole::Heartbeat => "h",
            DeviceRole::Transformed => "t",
            DeviceRole::Percent => "p",
            DeviceRole::Resync => "r",
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Channel prefix for a device path: `RAD` + the path's last character.
///
/// `/dev/ttyUSB1` becomes `RAD1`.
pub fn device_prefix(device: &str) -> String {
    let mut prefix = String::from(DEFAULT_PREFIX_STEM);
    if let Some(last) = device.chars().last() {
        prefix.push(last);
    }
    prefix
}

/// Channel for one bridge role under `prefix`.
pub fn device_channel(prefix: &str, role: DeviceRole) -> String {
    format!("{}{}", prefix, role.suffix())
}

/// First four characters of a channel name, or the whole name if shorter.
pub fn prefix4(channel: &str) -> &str {
    match channel.char_indices().nth(4) {
        Some((idx, _)) => &channel[..idx],
        None => channel,
    }
}

/// User-suffix rule: `prefix4(channel) + suffix`.
pub fn with_user_suffix(channel: &str, suffix: &str) -> String {
    format!("{}{}", prefix4(channel), suffix)
}

/// Heartbeat channel paired with a sample channel: drop the last character, add `h`.
///
/// `RAD2d` pairs with `RAD2h`.
pub fn heartbeat_companion(channel: &str) -> String {
    let mut chars = channel.chars();
    chars.next_back();
    format!("{}{}", chars.as_str(), DeviceRole::Heartbeat.suffix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_prefix_uses_last_path_character() {
        assert_eq!(device_prefix("/dev/ttyUSB1"), "RAD1");
        assert_eq!(device_prefix("/dev/ttyS2"), "RAD2");
        assert_eq!(device_prefix(""), "RAD");
        assert_eq!(device_channel("RAD1", DeviceRole::Inbound), "RAD1i");
        assert_eq!(device_channel("RAD1", DeviceRole::Resync), "RAD1r");
    }

    #[test]
    fn prefix4_truncates_or_keeps_short_names() {
        assert_eq!(prefix4("RAD1fd"), "RAD1");
        assert_eq!(prefix4("RAD"), "RAD");
        assert_eq!(prefix4("RÄD1x"), "RÄD1");
        assert_eq!(with_user_suffix("RAD1fd", "u"), "RAD1u");
        assert_eq!(with_user_suffix("RAD1t", "fd"), "RAD1fd");
    }

    #[test]
    fn heartbeat_companion_replaces_last_character() {
        assert_eq!(heartbeat_companion("RAD2d"), "RAD2h");
        assert_eq!(heartbeat_companion("RAD1p"), "RAD1h");
        assert_eq!(heartbeat_companion(""), "h");
    }
}
