//! Lazy line sequence over an async byte stream.
//!
//! `LineReader` owns the per-connection line buffer. It only touches the
//! socket when the buffer holds no complete line, so a single TCP read
//! carrying several lines yields them one by one without further I/O.

use crate::protocol::codec::LineCodec;
use bytes::BytesMut;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::trace;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Yields CRLF-delimited lines read from `R`.
///
/// The sequence is unbounded and not restartable: once the underlying
/// reader reports end of stream, `next_line` keeps returning `Ok(None)`.
#[derive(Debug)]
pub struct LineReader<R> {
    reader: R,
    buffer: BytesMut,
    codec: LineCodec,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    /// Wraps a reader with an empty line buffer.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            codec: LineCodec::new(),
            eof: false,
        }
    }

    /// Returns the next line, reading from the stream as needed.
    ///
    /// `Ok(None)` means the peer closed the stream. An unterminated fragment
    /// left at that point is discarded.
    ///
    /// # Cancel safety
    ///
    /// This method is cancel safe. If it is used in `tokio::select!` and
    /// another branch completes first, no received bytes are lost.
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(line) = self.codec.decode(&mut self.buffer) {
                return Ok(Some(line));
            }

            if self.eof {
                return Ok(None);
            }

            if self.buffer.capacity() - self.buffer.len() < 1024 {
                self.buffer.reserve(INITIAL_BUFFER_SIZE);
            }

            let n = self.reader.read_buf(&mut self.buffer).await?;
            if n == 0 {
                self.eof = true;
                if let Some(fragment) = self.codec.take_remainder(&mut self.buffer) {
                    trace!(bytes = fragment.len(), "Discarding unterminated line at end of stream");
                }
                return Ok(None);
            }

            trace!(bytes = n, buffered = self.buffer.len(), "Read data");
        }
    }

    /// Bytes received but not yet part of a complete line.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// Returns true once the stream has reported end of file.
    pub fn is_eof(&self) -> bool {
        self.eof
    }
}
