//! Newline-delimited framing.
//!
//! Reading goes through `tokio_util`'s `LinesCodec` inside a `FramedRead`,
//! which keeps partially received bytes in its own buffer. `read_line` can
//! therefore sit in a `tokio::select!` branch without losing data when
//! another branch wins.

use std::io;

use bytes::BytesMut;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{Decoder, FramedRead, LinesCodec, LinesCodecError};

use crate::error::ProtocolError;

/// Maximum line length accepted by default (64 KiB, terminator excluded).
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

// ============================================================================
// Codec
// ============================================================================

/// `LinesCodec` with protocol errors.
///
/// `LinesCodec` hands out a trailing unterminated line at EOF; here that is
/// `ProtocolError::UnterminatedLine` instead, so a half-sent line is never
/// treated as input.
#[derive(Debug)]
pub struct ChatLineCodec {
    inner: LinesCodec,
    max_len: usize,
}

impl ChatLineCodec {
    /// Creates a codec that rejects lines longer than `max_len` bytes.
    pub fn new(max_len: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_len),
            max_len,
        }
    }

    /// Returns the configured maximum line length.
    pub fn max_length(&self) -> usize {
        self.max_len
    }

    fn map_err(&self, err: LinesCodecError) -> ProtocolError {
        match err {
            LinesCodecError::MaxLineLengthExceeded => ProtocolError::LineTooLong { max: self.max_len },
            LinesCodecError::Io(e) if e.kind() == io::ErrorKind::InvalidData => {
                ProtocolError::InvalidUtf8
            }
            LinesCodecError::Io(e) => ProtocolError::Io(e),
        }
    }
}

impl Decoder for ChatLineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        self.inner.decode(src).map_err(|e| self.map_err(e))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let partial = src.len();
        src.clear();
        Err(ProtocolError::UnterminatedLine { partial })
    }
}

// ============================================================================
// Reader
// ============================================================================

/// Reads `\n`-terminated UTF-8 lines from a byte stream.
#[derive(Debug)]
pub struct LineReader<R> {
    inner: FramedRead<R, ChatLineCodec>,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Creates a reader with the default [`MAX_LINE_LENGTH`].
    pub fn new(inner: R) -> Self {
        Self::with_max_length(inner, MAX_LINE_LENGTH)
    }

    /// Creates a reader that rejects lines longer than `max_len` bytes.
    pub fn with_max_length(inner: R, max_len: usize) -> Self {
        Self {
            inner: FramedRead::new(inner, ChatLineCodec::new(max_len)),
        }
    }

    /// Reads the next line without its terminator.
    ///
    /// A trailing `\r` is stripped as well. Returns `Ok(None)` on a clean
    /// EOF between lines.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnterminatedLine` if the stream ends mid-line
    /// - `ProtocolError::LineTooLong` if no terminator arrives within the limit
    /// - `ProtocolError::InvalidUtf8` if the line is not UTF-8
    /// - `ProtocolError::Io` on transport errors
    pub async fn read_line(&mut self) -> Result<Option<String>, ProtocolError> {
        self.inner.next().await.transpose()
    }

    /// Returns the configured maximum line length.
    pub fn max_length(&self) -> usize {
        self.inner.decoder().max_length()
    }

    /// Consumes the reader, returning the underlying stream.
    ///
    /// Bytes already buffered by the codec are lost.
    pub fn into_inner(self) -> R {
        self.inner.into_inner()
    }
}

/// Writes `line` followed by `\n` and flushes.
///
/// The frame is assembled first so it reaches the stream in a single write.
pub async fn write_line<W>(writer: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut frame = Vec::with_capacity(line.len() + 1);
    frame.extend_from_slice(line.as_bytes());
    frame.push(b'\n');
    writer.write_all(&frame).await?;
    writer.flush().await
}
