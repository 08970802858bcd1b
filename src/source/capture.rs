//! Recorded serial capture served as a byte source
//!
//! A capture file is a verbatim dump of the bytes that arrived on the serial
//! port. The whole file is loaded into memory at open time; reads advance a
//! position counter and never wait.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::ByteSource;
use crate::{RadiometerError, Result};

/// Byte source backed by a capture file.
#[derive(Debug, Clone)]
pub struct CaptureSource {
    data: Vec<u8>,
    position: usize,
    path: PathBuf,
}

impl CaptureSource {
    /// Load a capture file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = std::fs::read(&path).map_err(|e| {
            RadiometerError::io(format!("reading capture {}", path.display()), e)
        })?;
        Ok(Self { data, position: 0, path })
    }

    /// Serve bytes already in memory (for testing)
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into(), position: 0, path: PathBuf::from("<memory>") }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Total capture size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Start again from the first byte.
    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl ByteSource for CaptureSource {
    fn read(&mut self, max: usize, _timeout: Duration) -> io::Result<Vec<u8>> {
        let end = self.position.saturating_add(max).min(self.data.len());
        let chunk = self.data[self.position..end].to_vec();
        self.position = end;
        Ok(chunk)
    }

    fn bytes_waiting(&mut self) -> io::Result<usize> {
        Ok(self.data.len() - self.position)
    }

    fn is_exhausted(&self) -> bool {
        self.position >= self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_advance_through_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4, 5]).unwrap();

        let mut source = CaptureSource::open(file.path()).unwrap();
        assert_eq!(source.len(), 5);
        assert_eq!(source.read(3, Duration::ZERO).unwrap(), vec![1, 2, 3]);
        assert_eq!(source.bytes_waiting().unwrap(), 2);
        assert_eq!(source.read(3, Duration::ZERO).unwrap(), vec![4, 5]);
        assert!(source.is_exhausted());
        assert!(source.read(1, Duration::ZERO).unwrap().is_empty());

        source.rewind();
        assert_eq!(source.position(), 0);
        assert!(!source.is_exhausted());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CaptureSource::open("/nonexistent/capture.bin").unwrap_err();
        assert!(matches!(err, RadiometerError::Io { .. }));
        assert!(err.to_string().contains("capture"));
    }
}
