//! Byte sources and sinks for the serial bridge.
//!
//! The framer only needs bounded-timeout reads and a count of bytes already
//! waiting, so live ports, capture files and in-memory buffers all implement
//! the same [`ByteSource`] trait. [`ByteSink`] is the write half used for
//! inbound commands.

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mod capture;
mod serial;

pub use capture::CaptureSource;
pub use serial::{DEFAULT_BAUD_RATE, SerialPortSink, SerialPortSource, SerialSettings, open_serial};

/// Readable half of a serial-like device.
pub trait ByteSource: Send {
    /// Read up to `max` bytes, waiting at most `timeout`. May return short.
    fn read(&mut self, max: usize, timeout: Duration) -> io::Result<Vec<u8>>;

    /// Bytes that can be read without waiting.
    fn bytes_waiting(&mut self) -> io::Result<usize>;

    /// True once no further bytes will ever arrive. Live ports never exhaust.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Writable half of a serial-like device.
pub trait ByteSink: Send {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn flush(&mut self) -> io::Result<()>;
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self, max: usize, timeout: Duration) -> io::Result<Vec<u8>> {
        (**self).read(max, timeout)
    }

    fn bytes_waiting(&mut self) -> io::Result<usize> {
        (**self).bytes_waiting()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}

impl<S: ByteSink + ?Sized> ByteSink for Box<S> {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// In-memory byte queue. Reads never wait.
#[derive(Debug, Default, Clone)]
pub struct MemorySource {
    buffer: VecDeque<u8>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<VecDeque<u8>>) -> Self {
        Self { buffer: bytes.into() }
    }

    /// Append bytes as if they had just arrived on the wire.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len()
    }
}

impl ByteSource for MemorySource {
    fn read(&mut self, max: usize, _timeout: Duration) -> io::Result<Vec<u8>> {
        let n = max.min(self.buffer.len());
        Ok(self.buffer.drain(..n).collect())
    }

    fn bytes_waiting(&mut self) -> io::Result<usize> {
        Ok(self.buffer.len())
    }

    fn is_exhausted(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Sink that records everything written, shareable with the test that inspects it.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    written: Arc<Mutex<Vec<u8>>>,
    flushes: Arc<Mutex<usize>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every byte written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.written.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn flush_count(&self) -> usize {
        self.flushes.lock().map(|f| *f).unwrap_or_default()
    }
}

impl ByteSink for MemorySink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.written
            .lock()
            .map_err(|_| io::Error::other("memory sink poisoned"))?
            .extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        *self.flushes.lock().map_err(|_| io::Error::other("memory sink poisoned"))? += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_reads_short_when_drained() {
        let mut source = MemorySource::new(vec![1, 2, 3]);
        assert_eq!(source.bytes_waiting().unwrap(), 3);
        assert_eq!(source.read(2, Duration::ZERO).unwrap(), vec![1, 2]);
        assert_eq!(source.read(5, Duration::ZERO).unwrap(), vec![3]);
        assert!(source.is_exhausted());

        source.push(&[4]);
        assert!(!source.is_exhausted());
        assert_eq!(source.read(1, Duration::ZERO).unwrap(), vec![4]);
    }

    #[test]
    fn memory_sink_is_shared_between_clones() {
        let sink = MemorySink::new();
        let mut writer: Box<dyn ByteSink> = Box::new(sink.clone());
        writer.write_all(b"abc").unwrap();
        writer.flush().unwrap();

        assert_eq!(sink.contents(), b"abc");
        assert_eq!(sink.flush_count(), 1);
    }
}
