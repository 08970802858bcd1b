//! Live serial port source via `serialport`

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, info};

use super::{ByteSink, ByteSource};
use crate::{RadiometerError, Result};

/// Baud rate used by the radiometer firmware.
pub const DEFAULT_BAUD_RATE: u32 = 38_400;

/// How to open the instrument's serial device (8N1, no flow control).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerialSettings {
    pub device: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_read_timeout", with = "millis")]
    pub read_timeout: Duration,
}

fn default_baud_rate() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_read_timeout() -> Duration {
    crate::framing::DEFAULT_READ_TIMEOUT
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

impl SerialSettings {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: default_read_timeout(),
        }
    }
}

/// Open the device and split it into independently owned read and write halves.
///
/// Pending input and output are discarded before the halves are returned.
pub fn open_serial(settings: &SerialSettings) -> Result<(SerialPortSource, SerialPortSink)> {
    let port = serialport::new(&settings.device, settings.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(settings.read_timeout)
        .open()
        .map_err(|e| RadiometerError::serial_open(&settings.device, e))?;

    port.clear(ClearBuffer::All).map_err(|e| RadiometerError::serial_open(&settings.device, e))?;
    let writer = port.try_clone().map_err(|e| RadiometerError::serial_open(&settings.device, e))?;

    info!(
        device = %settings.device,
        baud_rate = settings.baud_rate,
        "Opened serial device"
    );

    Ok((
        SerialPortSource { device: settings.device.clone(), port },
        SerialPortSink { device: settings.device.clone(), port: writer },
    ))
}

/// Read half of an open serial port.
pub struct SerialPortSource {
    device: String,
    port: Box<dyn SerialPort>,
}

impl SerialPortSource {
    pub fn device(&self) -> &str {
        &self.device
    }
}

impl std::fmt::Debug for SerialPortSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortSource").field("device", &self.device).finish()
    }
}

impl ByteSource for SerialPortSource {
    fn read(&mut self, max: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        let mut buffer = vec![0u8; max];
        let mut filled = 0;
        let deadline = Instant::now() + timeout;

        while filled < max {
            match self.port.read(&mut buffer[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => return Err(e),
            }
            if Instant::now() >= deadline {
                break;
            }
        }

        if filled < max {
            debug!(device = %self.device, "Serial read returned {} of {} bytes", filled, max);
        }
        buffer.truncate(filled);
        Ok(buffer)
    }

    fn bytes_waiting(&mut self) -> io::Result<usize> {
        self.port.bytes_to_read().map(|n| n as usize).map_err(io::Error::from)
    }
}

/// Write half of an open serial port.
pub struct SerialPortSink {
    device: String,
    port: Box<dyn SerialPort>,
}

impl std::fmt::Debug for SerialPortSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPortSink").field("device", &self.device).finish()
    }
}

impl ByteSink for SerialPortSink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        Write::write_all(&mut self.port, bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        Write::flush(&mut self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_to_firmware_rate() {
        let settings = SerialSettings::new("/dev/ttyUSB1");
        assert_eq!(settings.baud_rate, 38_400);
        assert_eq!(settings.read_timeout, Duration::from_secs(1));
    }

    #[test]
    fn opening_missing_device_is_a_serial_error() {
        let err = open_serial(&SerialSettings::new("/dev/does-not-exist-radiometer")).unwrap_err();
        assert!(matches!(err, RadiometerError::Serial { .. }));
        assert!(!err.is_retryable());
    }
}
