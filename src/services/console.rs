//! Serial console access for the watchdog monitor

use async_trait::async_trait;
use log::debug;
use std::io;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_serial::SerialStream;

use crate::errors::{HarnessError, Result};

/// Line-oriented byte source
#[async_trait]
pub trait LineSource: Send {
    /// Next line without its terminator, or `None` once the source is exhausted.
    ///
    /// Implementations must be cancel-safe: dropping the future mid-line keeps
    /// the bytes read so far for the next call.
    async fn read_line(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Opens serial consoles by device path
#[async_trait]
pub trait SerialConnector: Send + Sync {
    async fn open(&self, port_name: &str, baud_rate: u32) -> Result<Box<dyn LineSource>>;
}

/// `LineSource` over any buffered async reader
pub struct BufferedLineSource<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> BufferedLineSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Vec::new(),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> LineSource for BufferedLineSource<R> {
    async fn read_line(&mut self) -> io::Result<Option<Vec<u8>>> {
        // read_until appends to `pending`, so a cancelled call loses nothing
        let read = self.reader.read_until(b'\n', &mut self.pending).await?;
        if read == 0 && self.pending.is_empty() {
            return Ok(None);
        }

        let mut line = std::mem::take(&mut self.pending);
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        Ok(Some(line))
    }
}

/// Opens real serial ports through `tokio-serial`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSerialConnector;

#[async_trait]
impl SerialConnector for TokioSerialConnector {
    async fn open(&self, port_name: &str, baud_rate: u32) -> Result<Box<dyn LineSource>> {
        debug!("Opening serial console {} at {} baud", port_name, baud_rate);
        let stream = SerialStream::open(&tokio_serial::new(port_name, baud_rate)).map_err(|e| {
            HarnessError::ChannelOpenFailure {
                path: port_name.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Box::new(BufferedLineSource::new(stream)))
    }
}

/// Decode console bytes, dropping anything that is not valid UTF-8
pub fn decode_permissive(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_lines_are_split_and_trimmed() {
        let mut source = BufferedLineSource::new(&b"boot\r\nReset reason: Watchdog\npartial"[..]);
        assert_eq!(source.read_line().await.unwrap(), Some(b"boot".to_vec()));
        assert_eq!(
            source.read_line().await.unwrap(),
            Some(b"Reset reason: Watchdog".to_vec())
        );
        assert_eq!(source.read_line().await.unwrap(), Some(b"partial".to_vec()));
        assert_eq!(source.read_line().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_partial_line_survives_cancellation() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut source = BufferedLineSource::new(reader);

        writer.write_all(b"Reset reason: ").await.unwrap();
        let first = tokio::time::timeout(
            std::time::Duration::from_millis(20),
            source.read_line(),
        )
        .await;
        assert!(first.is_err(), "no complete line yet");

        writer.write_all(b"Watchdog\n").await.unwrap();
        assert_eq!(
            source.read_line().await.unwrap(),
            Some(b"Reset reason: Watchdog".to_vec())
        );
    }

    #[test]
    fn test_invalid_bytes_are_dropped() {
        assert_eq!(decode_permissive(b"Reset\xff reason"), "Reset reason");
        assert_eq!(decode_permissive(b"plain"), "plain");
    }
}
